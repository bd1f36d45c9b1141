//! Native channel implementation using tokio-tungstenite.

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{Sink, SinkExt, StreamExt};
use postlive_shared::Packet;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};

use super::{
    ChannelEvent, Command, ConnectionState, ReconnectConfig, SharedState, SocketEnd,
    SocketProtocol, Step, WsHandle,
};

/// The single channel connection of a page (Native implementation)
pub struct WsConnection {
    /// Socket.IO websocket URL
    pub url: String,
    state: SharedState,
    /// Channel for outbound commands
    sender: UnboundedSender<Command>,
}

impl WsConnection {
    /// Open the connection. Lifecycle and server events are pushed to `events`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        url: String,
        reconnect_config: ReconnectConfig,
        events: UnboundedSender<ChannelEvent>,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let state = SharedState::default();

        tokio::spawn(run_connection_loop(
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

        let end = match connect_async(url.as_str()).await {
            Ok((ws_stream, _response)) => {
                crate::log_debug!("Websocket open to {}", url);
                drive_socket(ws_stream, &mut protocol, &mut commands, &events, &state).await
            }
            Err(e) => SocketEnd::Failed(e.to_string()),
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
            crate::log_debug!("Nobody listens to {} anymore, stopping", url);
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
    let sleep = tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms as u64));
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            command = commands.next() => match command {
                Some(Command::Close) | None => return false,
                Some(emit) => protocol.park(emit),
            },
        }
    }
}

async fn drive_socket<S>(
    ws_stream: S,
    protocol: &mut SocketProtocol,
    commands: &mut UnboundedReceiver<Command>,
    events: &UnboundedSender<ChannelEvent>,
    state: &SharedState,
) -> SocketEnd
where
    S: futures_util::Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match protocol.on_text(text.as_str()) {
                        Step::Reply(reply) => {
                            if let Err(e) = write.send(Message::Text(reply.into())).await {
                                crate::log_error!("Send failed: {}", e);
                                return protocol.ended("transport error");
                            }
                        }
                        Step::Connected { sid, connection } => {
                            state.set(ConnectionState::Connected);
                            crate::log_info!("Channel connected (sid {:?})", sid);
                            let _ = events.unbounded_send(ChannelEvent::Connected { sid, connection });

                            for command in protocol.take_pending() {
                                if let Some(end) = write_command(&mut write, protocol, command).await {
                                    return end;
                                }
                            }
                        }
                        Step::Deliver(event) => {
                            let _ = events.unbounded_send(event);
                        }
                        Step::End(end) => {
                            let _ = write.close().await;
                            return end;
                        }
                        Step::Nothing => {}
                    }
                }
                Some(Ok(Message::Close(_))) | None => return protocol.ended("transport close"),
                Some(Ok(_)) => {
                    // Binary frames are not used; tungstenite answers websocket pings itself
                }
                Some(Err(e)) => {
                    crate::log_error!("Websocket read error: {}", e);
                    return protocol.ended("transport error");
                }
            },
            command = commands.next() => {
                let command = command.unwrap_or(Command::Close);
                if let Some(end) = write_command(&mut write, protocol, command).await {
                    return end;
                }
            }
        }
    }
}

/// Write one outbound command. Returns how the socket ended if it did.
async fn write_command<W>(
    write: &mut W,
    protocol: &mut SocketProtocol,
    command: Command,
) -> Option<SocketEnd>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match command {
        Command::Emit {
            event,
            ack,
            connection,
        } => match protocol.emit(event, ack, connection) {
            Ok(Some(frame)) => {
                crate::log_debug!("Sending: {}", frame);
                if let Err(e) = write.send(Message::Text(frame.into())).await {
                    crate::log_error!("Send failed: {}", e);
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
            let _ = write
                .send(Message::Text(Packet::Disconnect.encode().into()))
                .await;
            let _ = write.close().await;
            Some(SocketEnd::TornDown)
        }
    }
}
