//! WASM/Web channel implementation using web_sys::WebSocket.

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::future::{select, Either};
use futures_util::StreamExt;
use postlive_shared::Packet;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{js_sys, CloseEvent, ErrorEvent, MessageEvent, WebSocket};

use super::{
    ChannelEvent, Command, ConnectionState, ReconnectConfig, SharedState, SocketEnd,
    SocketProtocol, Step, WsHandle,
};

/// The single channel connection of a page (WASM implementation)
pub struct WsConnection {
    /// Socket.IO websocket URL
    pub url: String,
    state: SharedState,
    /// Channel for outbound commands
    sender: UnboundedSender<Command>,
}

impl WsConnection {
    /// Open the connection. Lifecycle and server events are pushed to `events`.
    pub fn open(
        url: String,
        reconnect_config: ReconnectConfig,
        events: UnboundedSender<ChannelEvent>,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let state = SharedState::default();

        spawn_local(run_connection_loop(
            url.clone(),
            state.clone(),
            receiver,
            events,
            reconnect_config,
        ));

        Self { url, state, sender }
    }

    /// Get a handle for emitting events
    pub fn handle(&self) -> WsHandle {
        WsHandle::new(self.sender.clone(), self.state.clone(), self.url.clone())
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }
}

/// What the browser socket callbacks report.
enum Frame {
    Text(String),
    Closed(String),
    Error,
}

/// Keeps the JS callbacks alive for as long as the socket is in use.
struct BrowserSocket {
    ws: WebSocket,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
    _onclose: Closure<dyn FnMut(CloseEvent)>,
    _onerror: Closure<dyn FnMut(ErrorEvent)>,
}

impl BrowserSocket {
    fn open(url: &str) -> Result<(Self, UnboundedReceiver<Frame>), String> {
        let ws = WebSocket::new(url).map_err(|e| format!("Failed to create WebSocket: {:?}", e))?;
        let (frames_tx, frames_rx) = unbounded::<Frame>();

        let tx = frames_tx.clone();
        let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| {
            if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
                let _ = tx.unbounded_send(Frame::Text(text.into()));
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        let tx = frames_tx.clone();
        let onclose = Closure::wrap(Box::new(move |e: CloseEvent| {
            let reason = if e.reason().is_empty() {
                format!("Code {}", e.code())
            } else {
                e.reason()
            };
            let _ = tx.unbounded_send(Frame::Closed(reason));
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

        let tx = frames_tx;
        let onerror = Closure::wrap(Box::new(move |_: ErrorEvent| {
            let _ = tx.unbounded_send(Frame::Error);
        }) as Box<dyn FnMut(ErrorEvent)>);
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        Ok((
            Self {
                ws,
                _onmessage: onmessage,
                _onclose: onclose,
                _onerror: onerror,
            },
            frames_rx,
        ))
    }

    fn send(&self, frame: &str) -> Result<(), String> {
        self.ws
            .send_with_str(frame)
            .map_err(|e| format!("Send failed: {:?}", e))
    }
}

impl Drop for BrowserSocket {
    fn drop(&mut self) {
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        self.ws.set_onerror(None);
        let _ = self.ws.close();
    }
}

/// Connect, drive the socket until it ends, back off, repeat.
async fn run_connection_loop(
    url: String,
    state: SharedState,
    mut commands: UnboundedReceiver<Command>,
    events: UnboundedSender<ChannelEvent>,
    reconnect_config: ReconnectConfig,
) {
    let mut protocol = SocketProtocol::default();
    let mut attempt = 0u32;

    loop {
        if attempt == 0 {
            state.set(ConnectionState::Connecting);
        } else {
            state.set(ConnectionState::Reconnecting { attempt });
        }

        let end = match BrowserSocket::open(&url) {
            Ok((socket, frames)) => {
                drive_socket(socket, frames, &mut protocol, &mut commands, &events, &state).await
            }
            Err(e) => SocketEnd::Failed(e),
        };
        protocol.reset();

        match end {
            SocketEnd::TornDown => {
                state.set(ConnectionState::Disconnected);
                crate::log_info!("Channel to {} torn down", url);
                return;
            }
            SocketEnd::Lost(reason) => {
                state.set(ConnectionState::Disconnected);
                crate::log_info!("Channel to {} lost: {}", url, reason);
                attempt = 0;
                let _ = events.unbounded_send(ChannelEvent::Disconnected { reason });
            }
            SocketEnd::Failed(message) => {
                crate::log_error!("Channel error for {}: {}", url, message);
                let _ = events.unbounded_send(ChannelEvent::ConnectError { message });

                if reconnect_config.exhausted(attempt) {
                    state.set(ConnectionState::Failed {
                        reason: format!(
                            "Max reconnect attempts ({}) exceeded",
                            reconnect_config.max_attempts
                        ),
                    });
                    return;
                }
            }
        }

        if events.is_closed() {
            state.set(ConnectionState::Disconnected);
            return;
        }

        let delay = reconnect_config.delay_for_attempt(attempt);
        crate::log_info!(
            "Reconnecting to {} in {}ms (attempt {})",
            url,
            delay,
            attempt + 1
        );
        if !wait_for_retry(delay, &mut protocol, &mut commands).await {
            state.set(ConnectionState::Disconnected);
            return;
        }
        attempt += 1;
    }
}

/// Sleep through the backoff, parking emits. `false` when the channel was closed meanwhile.
async fn wait_for_retry(
    delay_ms: u32,
    protocol: &mut SocketProtocol,
    commands: &mut UnboundedReceiver<Command>,
) -> bool {
    let mut timeout = gloo_timers::future::TimeoutFuture::new(delay_ms);

    loop {
        match select(&mut timeout, commands.next()).await {
            Either::Left(_) => return true,
            Either::Right((Some(Command::Close), _)) | Either::Right((None, _)) => return false,
            Either::Right((Some(emit), _)) => protocol.park(emit),
        }
    }
}

async fn drive_socket(
    socket: BrowserSocket,
    mut frames: UnboundedReceiver<Frame>,
    protocol: &mut SocketProtocol,
    commands: &mut UnboundedReceiver<Command>,
    events: &UnboundedSender<ChannelEvent>,
    state: &SharedState,
) -> SocketEnd {
    loop {
        match select(frames.next(), commands.next()).await {
            Either::Left((Some(Frame::Text(text)), _)) => match protocol.on_text(&text) {
                Step::Reply(reply) => {
                    if let Err(e) = socket.send(&reply) {
                        crate::log_error!("{}", e);
                        return protocol.ended("transport error");
                    }
                }
                Step::Connected { sid, connection } => {
                    state.set(ConnectionState::Connected);
                    crate::log_info!("Channel connected (sid {:?})", sid);
                    let _ = events.unbounded_send(ChannelEvent::Connected { sid, connection });

                    for command in protocol.take_pending() {
                        if let Some(end) = write_command(&socket, protocol, command) {
                            return end;
                        }
                    }
                }
                Step::Deliver(event) => {
                    let _ = events.unbounded_send(event);
                }
                Step::End(end) => return end,
                Step::Nothing => {}
            },
            Either::Left((Some(Frame::Closed(reason)), _)) => {
                crate::log_info!("WebSocket onclose: {}", reason);
                return protocol.ended("transport close");
            }
            Either::Left((Some(Frame::Error), _)) | Either::Left((None, _)) => {
                crate::log_error!("WebSocket onerror fired");
                return protocol.ended("transport error");
            }
            Either::Right((command, _)) => {
                let command = command.unwrap_or(Command::Close);
                if let Some(end) = write_command(&socket, protocol, command) {
                    return end;
                }
            }
        }
    }
}

/// Write one outbound command. Returns how the socket ended if it did.
fn write_command(
    socket: &BrowserSocket,
    protocol: &mut SocketProtocol,
    command: Command,
) -> Option<SocketEnd> {
    match command {
        Command::Emit {
            event,
            ack,
            connection,
        } => match protocol.emit(event, ack, connection) {
            Ok(Some(frame)) => {
                crate::log_debug!("Sending: {}", frame);
                if let Err(e) = socket.send(&frame) {
                    crate::log_error!("{}", e);
                    return Some(protocol.ended("transport error"));
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                crate::log_error!("Failed to encode emit: {}", e);
                None
            }
        },
        Command::Close => {
            let _ = socket.send(&Packet::Disconnect.encode());
            Some(SocketEnd::TornDown)
        }
    }
}
