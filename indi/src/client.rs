//! INDI client implementation
//!
//! [`IndiClient`] owns one TCP connection to an INDI server. Bytes read from
//! the socket go through the [`XmlTokenizer`], every completed root element
//! is classified and, when some handler slot wants it, parsed once into a
//! typed message and fanned out to the [`IndiClientHandler`].
//!
//! Outbound commands go through an [`IndiSender`], a cheap cloneable handle
//! on the writer task. Handlers receive one with every callback so they can
//! react to a message with further commands without awaiting anything.

use bitflags::bitflags;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::ClientConfig;
use crate::error::{IndiError, IndiResult};
use crate::protocol::{
    classify, AnyVector, BlobVector, DelProperty, Direction, EnableBlob, GetProperties, LightVector, Message,
    NewNumberVector, NewSwitchVector, NewTextVector, NumberVector, SwitchVector, TextVector, VectorKind,
};
use crate::xml::{XmlNode, XmlTokenizer};

bitflags! {
    /// Callbacks an [`IndiClientHandler`] actually implements.
    ///
    /// Messages nobody subscribed to are never parsed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HandlerSlots: u32 {
        const MESSAGE = 1 << 0;
        const DEL_PROPERTY = 1 << 1;
        const CLOSE = 1 << 2;

        const DEF_TEXT_VECTOR = 1 << 3;
        const DEF_NUMBER_VECTOR = 1 << 4;
        const DEF_SWITCH_VECTOR = 1 << 5;
        const DEF_LIGHT_VECTOR = 1 << 6;
        const DEF_BLOB_VECTOR = 1 << 7;

        const SET_TEXT_VECTOR = 1 << 8;
        const SET_NUMBER_VECTOR = 1 << 9;
        const SET_SWITCH_VECTOR = 1 << 10;
        const SET_LIGHT_VECTOR = 1 << 11;
        const SET_BLOB_VECTOR = 1 << 12;

        const TEXT_VECTOR = 1 << 13;
        const NUMBER_VECTOR = 1 << 14;
        const SWITCH_VECTOR = 1 << 15;
        const LIGHT_VECTOR = 1 << 16;
        const BLOB_VECTOR = 1 << 17;

        const VECTOR = 1 << 18;
        const DEF_VECTOR = 1 << 19;
    }
}

impl HandlerSlots {
    /// Slot for one kind in one direction, e.g. `defSwitchVector`
    pub fn kind_direction(kind: VectorKind, direction: Direction) -> Self {
        match (direction, kind) {
            (Direction::Def, VectorKind::Text) => Self::DEF_TEXT_VECTOR,
            (Direction::Def, VectorKind::Number) => Self::DEF_NUMBER_VECTOR,
            (Direction::Def, VectorKind::Switch) => Self::DEF_SWITCH_VECTOR,
            (Direction::Def, VectorKind::Light) => Self::DEF_LIGHT_VECTOR,
            (Direction::Def, VectorKind::Blob) => Self::DEF_BLOB_VECTOR,
            (Direction::Set, VectorKind::Text) => Self::SET_TEXT_VECTOR,
            (Direction::Set, VectorKind::Number) => Self::SET_NUMBER_VECTOR,
            (Direction::Set, VectorKind::Switch) => Self::SET_SWITCH_VECTOR,
            (Direction::Set, VectorKind::Light) => Self::SET_LIGHT_VECTOR,
            (Direction::Set, VectorKind::Blob) => Self::SET_BLOB_VECTOR,
        }
    }

    /// Slot for one kind in both directions, e.g. `switchVector`
    pub fn kind(kind: VectorKind) -> Self {
        match kind {
            VectorKind::Text => Self::TEXT_VECTOR,
            VectorKind::Number => Self::NUMBER_VECTOR,
            VectorKind::Switch => Self::SWITCH_VECTOR,
            VectorKind::Light => Self::LIGHT_VECTOR,
            VectorKind::Blob => Self::BLOB_VECTOR,
        }
    }

    /// Every slot a vector of this kind and direction is delivered to
    pub fn relevant(kind: VectorKind, direction: Direction) -> Self {
        let mut slots = Self::kind_direction(kind, direction) | Self::kind(kind) | Self::VECTOR;

        if direction == Direction::Def {
            slots |= Self::DEF_VECTOR;
        }

        slots
    }
}

/// Receiver of the messages of an [`IndiClient`].
///
/// Every method has a no-op default. An implementation overrides the ones it
/// needs and lists them in [`IndiClientHandler::slots`]. For each vector the
/// slots are called in order of decreasing specificity: kind and direction,
/// kind, [`vector`](Self::vector), and for definitions
/// [`def_vector`](Self::def_vector).
#[allow(unused_variables)]
pub trait IndiClientHandler {
    fn slots(&self) -> HandlerSlots {
        HandlerSlots::empty()
    }

    fn message(&mut self, client: &IndiSender, message: &Message) {}

    fn del_property(&mut self, client: &IndiSender, message: &DelProperty) {}

    fn def_text_vector(&mut self, client: &IndiSender, vector: &TextVector) {}

    fn def_number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {}

    fn def_switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {}

    fn def_light_vector(&mut self, client: &IndiSender, vector: &LightVector) {}

    fn def_blob_vector(&mut self, client: &IndiSender, vector: &BlobVector) {}

    fn set_text_vector(&mut self, client: &IndiSender, vector: &TextVector) {}

    fn set_number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {}

    fn set_switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {}

    fn set_light_vector(&mut self, client: &IndiSender, vector: &LightVector) {}

    fn set_blob_vector(&mut self, client: &IndiSender, vector: &BlobVector) {}

    fn text_vector(&mut self, client: &IndiSender, vector: &TextVector) {}

    fn number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {}

    fn switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {}

    fn light_vector(&mut self, client: &IndiSender, vector: &LightVector) {}

    fn blob_vector(&mut self, client: &IndiSender, vector: &BlobVector) {}

    fn vector(&mut self, client: &IndiSender, vector: &AnyVector) {}

    fn def_vector(&mut self, client: &IndiSender, vector: &AnyVector) {}

    /// The connection is gone. `server` tells whether the server closed it.
    fn close(&mut self, client: &IndiSender, server: bool) {}
}

/// Classify a root element and deliver it to the handler slots that want it.
pub fn dispatch<H: IndiClientHandler + ?Sized>(handler: &mut H, client: &IndiSender, node: &XmlNode) {
    let slots = handler.slots();

    match node.name.as_str() {
        "message" => {
            if slots.contains(HandlerSlots::MESSAGE) {
                handler.message(client, &Message::from_node(node));
            }
        }
        "delProperty" => {
            if slots.contains(HandlerSlots::DEL_PROPERTY) {
                match DelProperty::from_node(node) {
                    Ok(message) => handler.del_property(client, &message),
                    Err(e) => tracing::debug!("dropping delProperty: {}", e),
                }
            }
        }
        "newTextVector" | "newNumberVector" | "newSwitchVector" | "newBLOBVector" | "getProperties" | "enableBLOB" => {
            tracing::trace!("ignoring echoed <{}>", node.name);
        }
        tag => {
            let Some((kind, direction)) = classify(tag) else {
                tracing::warn!("unknown tag: {}", tag);
                return;
            };

            if !slots.intersects(HandlerSlots::relevant(kind, direction)) {
                return;
            }

            let vector = match AnyVector::parse(node, kind, direction) {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::debug!("dropping <{}>: {}", tag, e);
                    return;
                }
            };

            deliver_to_slots(handler, client, &vector, slots);
        }
    }
}

/// Deliver an already parsed vector to the handler slots that want it.
pub fn deliver<H: IndiClientHandler + ?Sized>(handler: &mut H, client: &IndiSender, vector: &AnyVector) {
    let slots = handler.slots();
    deliver_to_slots(handler, client, vector, slots);
}

fn deliver_to_slots<H: IndiClientHandler + ?Sized>(
    handler: &mut H,
    client: &IndiSender,
    vector: &AnyVector,
    slots: HandlerSlots,
) {
    let (kind, direction) = (vector.kind(), vector.direction());

    if slots.contains(HandlerSlots::kind_direction(kind, direction)) {
        dispatch_kind_direction(handler, client, vector);
    }

    if slots.contains(HandlerSlots::kind(kind)) {
        dispatch_kind(handler, client, vector);
    }

    if slots.contains(HandlerSlots::VECTOR) {
        handler.vector(client, vector);
    }

    if direction == Direction::Def && slots.contains(HandlerSlots::DEF_VECTOR) {
        handler.def_vector(client, vector);
    }
}

fn dispatch_kind_direction<H: IndiClientHandler + ?Sized>(handler: &mut H, client: &IndiSender, vector: &AnyVector) {
    let def = vector.is_def();

    match vector {
        AnyVector::Text(v) if def => handler.def_text_vector(client, v),
        AnyVector::Text(v) => handler.set_text_vector(client, v),
        AnyVector::Number(v) if def => handler.def_number_vector(client, v),
        AnyVector::Number(v) => handler.set_number_vector(client, v),
        AnyVector::Switch(v) if def => handler.def_switch_vector(client, v),
        AnyVector::Switch(v) => handler.set_switch_vector(client, v),
        AnyVector::Light(v) if def => handler.def_light_vector(client, v),
        AnyVector::Light(v) => handler.set_light_vector(client, v),
        AnyVector::Blob(v) if def => handler.def_blob_vector(client, v),
        AnyVector::Blob(v) => handler.set_blob_vector(client, v),
    }
}

fn dispatch_kind<H: IndiClientHandler + ?Sized>(handler: &mut H, client: &IndiSender, vector: &AnyVector) {
    match vector {
        AnyVector::Text(v) => handler.text_vector(client, v),
        AnyVector::Number(v) => handler.number_vector(client, v),
        AnyVector::Switch(v) => handler.switch_vector(client, v),
        AnyVector::Light(v) => handler.light_vector(client, v),
        AnyVector::Blob(v) => handler.blob_vector(client, v),
    }
}

/// Handle for sending commands to the INDI server.
///
/// Commands are queued to the writer task and never awaited. When the client
/// is not connected they are silently dropped.
#[derive(Debug, Clone, Default)]
pub struct IndiSender {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl IndiSender {
    /// Create a sender whose commands end up in the returned receiver
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn is_connected(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Queue a raw command, failing when there is no live connection
    pub fn try_send_command(&self, command: String) -> IndiResult<()> {
        let tx = self.tx.as_ref().ok_or(IndiError::NotConnected)?;
        tx.send(command).map_err(|_| IndiError::NotConnected)
    }

    /// Queue a raw command
    pub fn send_command(&self, command: String) {
        if let Err(e) = self.try_send_command(command) {
            tracing::trace!("command dropped: {}", e);
        }
    }

    pub fn get_properties(&self, command: &GetProperties) {
        self.send_command(command.to_xml());
    }

    pub fn enable_blob(&self, command: &EnableBlob) {
        self.send_command(command.to_xml());
    }

    pub fn send_text(&self, vector: &NewTextVector) {
        self.send_command(vector.to_xml());
    }

    pub fn send_number(&self, vector: &NewNumberVector) {
        self.send_command(vector.to_xml());
    }

    pub fn send_switch(&self, vector: &NewSwitchVector) {
        self.send_command(vector.to_xml());
    }
}

/// Writer task - sends commands to INDI server
async fn writer_task<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(cmd) = rx.recv().await {
        tracing::trace!("-> {}", cmd);

        if let Err(e) = writer.write_all(cmd.as_bytes()).await {
            tracing::error!("INDI write error: {}", e);
            break;
        }
        if let Err(e) = writer.write_all(b"\n").await {
            tracing::error!("INDI write error: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            tracing::error!("INDI flush error: {}", e);
            break;
        }
    }
}

/// INDI client over one TCP connection
pub struct IndiClient<H> {
    config: ClientConfig,
    tokenizer: XmlTokenizer,
    handler: H,
    sender: IndiSender,
    reader: Option<OwnedReadHalf>,
    writer: Option<JoinHandle<()>>,
    buffer: Vec<u8>,
}

impl<H: IndiClientHandler> IndiClient<H> {
    pub fn new(handler: H) -> Self {
        Self::with_config(ClientConfig::default(), handler)
    }

    pub fn with_config(config: ClientConfig, handler: H) -> Self {
        Self {
            buffer: vec![0; config.read_buffer_size.max(1)],
            config,
            tokenizer: XmlTokenizer::new(),
            handler,
            sender: IndiSender::default(),
            reader: None,
            writer: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Handle for sending commands on this connection
    pub fn sender(&self) -> IndiSender {
        self.sender.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.reader.is_some()
    }

    /// Connect to the host and port of the client configuration
    pub async fn connect_configured(&mut self) -> IndiResult<bool> {
        let host = self.config.host.clone();
        let port = self.config.port;
        self.connect(&host, port).await
    }

    /// Connect to the INDI server and request every property it knows.
    ///
    /// Returns `Ok(false)` without doing anything when already connected.
    pub async fn connect(&mut self, host: &str, port: u16) -> IndiResult<bool> {
        if self.is_connected() {
            return Ok(false);
        }

        let addr = format!("{}:{}", host, port);
        let connection_timeout = self.config.connection_timeout();

        let stream = match timeout(connection_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(IndiError::ConnectionFailed(format!(
                    "Failed to connect to INDI server at {}: {}. Check that the server is running and the address is correct.",
                    addr, e
                )));
            }
            Err(_) => {
                return Err(IndiError::ConnectionTimeout {
                    host: host.to_string(),
                    port,
                    duration: connection_timeout,
                });
            }
        };

        let (read_half, write_half) = stream.into_split();
        let (sender, rx) = IndiSender::channel();

        self.writer = Some(tokio::spawn(writer_task(write_half, rx)));

        self.tokenizer.reset();
        self.reader = Some(read_half);
        self.sender = sender;

        tracing::info!("Connected to INDI server at {}", addr);

        self.sender.get_properties(&GetProperties::default());

        Ok(true)
    }

    /// Wait for one chunk from the socket and dispatch it.
    ///
    /// Returns `false` once the connection is closed.
    pub async fn read(&mut self) -> bool {
        let Some(reader) = self.reader.as_mut() else {
            return false;
        };

        match reader.read(&mut self.buffer).await {
            Ok(0) => {
                tracing::info!("Connection closed by server");
                self.shutdown(true);
                false
            }
            Ok(n) => {
                let buffer = std::mem::take(&mut self.buffer);
                self.parse(&buffer[..n]);
                self.buffer = buffer;
                true
            }
            Err(e) => {
                tracing::warn!("INDI read error: {}", e);
                self.shutdown(true);
                false
            }
        }
    }

    /// Read and dispatch until the connection is closed
    pub async fn run(&mut self) {
        while self.read().await {}
    }

    /// Feed raw protocol bytes through the tokenizer and dispatch them
    pub fn parse(&mut self, bytes: &[u8]) {
        for node in self.tokenizer.parse(bytes) {
            tracing::trace!("<- <{}>", node.name);
            dispatch(&mut self.handler, &self.sender, &node);
        }
    }

    /// Close the connection from the client side
    pub fn close(&mut self) {
        if self.is_connected() {
            tracing::info!("Connection closed by client");
            self.shutdown(false);
        }
    }

    fn shutdown(&mut self, server: bool) {
        if self.reader.take().is_none() {
            return;
        }

        // Stopping the writer drops the write half, which closes the socket.
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }

        self.sender = IndiSender::default();
        self.tokenizer.reset();

        if self.handler.slots().contains(HandlerSlots::CLOSE) {
            self.handler.close(&self.sender, server);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    struct Recorder {
        slots: HandlerSlots,
        calls: Vec<String>,
    }

    impl Recorder {
        fn with_slots(slots: HandlerSlots) -> Self {
            Self { slots, calls: Vec::new() }
        }
    }

    impl Default for Recorder {
        fn default() -> Self {
            Self::with_slots(HandlerSlots::all())
        }
    }

    impl IndiClientHandler for Recorder {
        fn slots(&self) -> HandlerSlots {
            self.slots
        }

        fn message(&mut self, _: &IndiSender, message: &Message) {
            self.calls.push(format!("message:{}", message.message.as_deref().unwrap_or_default()));
        }

        fn del_property(&mut self, _: &IndiSender, message: &DelProperty) {
            self.calls.push(format!("del_property:{}", message.device));
        }

        fn def_switch_vector(&mut self, _: &IndiSender, _: &SwitchVector) {
            self.calls.push("def_switch_vector".to_string());
        }

        fn set_switch_vector(&mut self, _: &IndiSender, _: &SwitchVector) {
            self.calls.push("set_switch_vector".to_string());
        }

        fn switch_vector(&mut self, _: &IndiSender, vector: &SwitchVector) {
            self.calls.push(format!("switch_vector:{:?}", vector.direction));
        }

        fn number_vector(&mut self, _: &IndiSender, _: &NumberVector) {
            self.calls.push("number_vector".to_string());
        }

        fn vector(&mut self, _: &IndiSender, vector: &AnyVector) {
            self.calls.push(format!("vector:{}", vector.tag()));
        }

        fn def_vector(&mut self, _: &IndiSender, vector: &AnyVector) {
            self.calls.push(format!("def_vector:{}", vector.name()));
        }

        fn close(&mut self, _: &IndiSender, server: bool) {
            self.calls.push(format!("close:{}", server));
        }
    }

    const DEF_CONNECTION: &[u8] = br#"<defSwitchVector device="CCD Simulator" name="CONNECTION" state="Idle" perm="rw" rule="OneOfMany"><defSwitch name="CONNECT">Off</defSwitch><defSwitch name="DISCONNECT">On</defSwitch></defSwitchVector>"#;
    const SET_CONNECTION: &[u8] = br#"<setSwitchVector device="CCD Simulator" name="CONNECTION" state="Ok"><oneSwitch name="CONNECT">On</oneSwitch><oneSwitch name="DISCONNECT">Off</oneSwitch></setSwitchVector>"#;

    #[test]
    fn test_dispatch_order() {
        let mut client = IndiClient::new(Recorder::default());
        client.parse(DEF_CONNECTION);
        client.parse(SET_CONNECTION);

        assert_eq!(
            client.handler().calls,
            vec![
                "def_switch_vector",
                "switch_vector:Def",
                "vector:defSwitchVector",
                "def_vector:CONNECTION",
                "set_switch_vector",
                "switch_vector:Set",
                "vector:setSwitchVector",
            ]
        );
    }

    #[test]
    fn test_only_declared_slots_are_called() {
        let mut client = IndiClient::new(Recorder::with_slots(HandlerSlots::DEF_VECTOR | HandlerSlots::MESSAGE));
        client.parse(DEF_CONNECTION);
        client.parse(SET_CONNECTION);
        client.parse(br#"<delProperty device="CCD Simulator"/><message device="CCD Simulator" message="hi"/>"#);

        assert_eq!(client.handler().calls, vec!["def_vector:CONNECTION", "message:hi"]);
    }

    #[test]
    fn test_undeclared_kind_is_skipped() {
        let mut client = IndiClient::new(Recorder::with_slots(HandlerSlots::SWITCH_VECTOR));
        client.parse(br#"<defNumberVector device="d" name="n"><defNumber name="v">1</defNumber></defNumberVector>"#);
        assert!(client.handler().calls.is_empty());

        let mut client = IndiClient::new(Recorder::with_slots(HandlerSlots::NUMBER_VECTOR));
        client.parse(br#"<setNumberVector device="d" name="n"><oneNumber name="v">1</oneNumber></setNumberVector>"#);
        assert_eq!(client.handler().calls, vec!["number_vector"]);
    }

    #[test]
    fn test_unknown_and_echoed_tags_are_ignored() {
        let mut client = IndiClient::new(Recorder::default());
        client.parse(br#"<newSwitchVector device="d" name="CONNECTION"><oneSwitch name="CONNECT">On</oneSwitch></newSwitchVector>"#);
        client.parse(br#"<getProperties version="1.7"/><pingRequest uid="1"/>"#);
        client.parse(br#"<setSwitchVector name="CONNECTION"><oneSwitch name="CONNECT">On</oneSwitch></setSwitchVector>"#);
        client.parse(b"<delProperty/>");

        assert!(client.handler().calls.is_empty());
    }

    #[test]
    fn test_sender_is_noop_when_disconnected() {
        let sender = IndiSender::default();
        assert!(!sender.is_connected());
        sender.get_properties(&GetProperties::default());

        let (sender, mut rx) = IndiSender::channel();
        assert!(sender.is_connected());
        sender.send_switch(&NewSwitchVector::new("CCD Simulator", "CONNECTION").element("CONNECT", true));
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"<newSwitchVector device="CCD Simulator" name="CONNECTION"><oneSwitch name="CONNECT">On</oneSwitch></newSwitchVector>"#
        );

        drop(rx);
        assert!(!sender.is_connected());
        assert!(matches!(
            sender.try_send_command("<getProperties version=\"1.7\"/>".to_string()),
            Err(IndiError::NotConnected)
        ));
        assert!(matches!(IndiSender::default().try_send_command(String::new()), Err(IndiError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_sends_get_properties() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut client = IndiClient::new(Recorder::default());
        assert!(client.connect("127.0.0.1", port).await.unwrap());
        assert!(client.is_connected());

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 128];

        while !received.contains(&b'\n') {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0);
            received.extend_from_slice(&buf[..n]);
        }

        assert_eq!(String::from_utf8_lossy(&received).trim(), r#"<getProperties version="1.7"/>"#);

        // Already connected
        assert!(!client.connect("127.0.0.1", port).await.unwrap());

        socket.write_all(br#"<message device="CCD Simulator" message="hello"/>"#).await.unwrap();
        assert!(client.read().await);
        assert_eq!(client.handler().calls, vec!["message:hello"]);

        drop(socket);
        assert!(!client.read().await);
        assert!(!client.is_connected());

        client.close();
        assert_eq!(client.handler().calls, vec!["message:hello", "close:true"]);
    }

    #[tokio::test]
    async fn test_client_close_fires_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut client = IndiClient::new(Recorder::default());
        client.connect("127.0.0.1", port).await.unwrap();
        assert!(client.sender().is_connected());

        client.close();
        client.close();

        assert_eq!(client.handler().calls, vec!["close:false"]);
        assert!(!client.sender().is_connected());
        assert!(!client.read().await);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut client = IndiClient::new(Recorder::default());
        let result = client.connect("127.0.0.1", port).await;

        assert!(matches!(result, Err(IndiError::ConnectionFailed(_))));
        assert!(!client.is_connected());
    }
}
