//! # Server Module
//!
//! TCP transport speaking newline-delimited JSON.
//!
//! One game task owns the [`SessionGateway`] and is the only place game state is
//! touched. Connection tasks forward parsed hellos and raw intent lines to it over
//! a channel and write back whatever lines it routes to their session. An interval
//! timer drives the world's virtual clock from real elapsed time.

use crate::{
    new_player_id, parse_hello, ClientHello, Outbound, PlayerId, SessionGateway, TacticaError,
    TacticaResult, WireMessage,
};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, MissedTickBehavior};

/// Messages from connection tasks to the game task.
#[derive(Debug)]
enum Command {
    Connect {
        session: PlayerId,
        hello: ClientHello,
        outbound: UnboundedSender<String>,
    },
    Line {
        session: PlayerId,
        line: String,
    },
    Disconnect {
        session: PlayerId,
    },
}

/// A bound game server.
pub struct Server {
    listener: TcpListener,
    gateway: SessionGateway,
    tick: Duration,
}

impl Server {
    /// Binds the listening socket. `tick` is the game loop's clock resolution.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        gateway: SessionGateway,
        tick: Duration,
    ) -> TacticaResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            gateway,
            tick: tick.max(Duration::from_millis(1)),
        })
    }

    pub fn local_addr(&self) -> TacticaResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the listener fails.
    pub async fn run(self) -> TacticaResult<()> {
        let Self {
            listener,
            gateway,
            tick,
        } = self;
        info!("Listening on {}", listener.local_addr()?);

        let (commands, inbox) = mpsc::unbounded_channel();
        tokio::spawn(run_game_loop(gateway, inbox, tick));

        loop {
            let (stream, peer) = listener.accept().await?;
            if let Err(e) = stream.set_nodelay(true) {
                debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
            }
            info!("Connection from {}", peer);
            let commands = commands.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_session(stream, commands).await {
                    warn!("Connection from {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

enum Wake {
    Command(Option<Command>),
    Tick,
}

async fn run_game_loop(
    mut gateway: SessionGateway,
    mut inbox: UnboundedReceiver<Command>,
    tick: Duration,
) {
    let mut sessions: HashMap<PlayerId, UnboundedSender<String>> = HashMap::new();
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        let wake = tokio::select! {
            command = inbox.recv() => Wake::Command(command),
            _ = interval.tick() => Wake::Tick,
        };

        // Timers that fell due before this wake-up run first
        let now = Instant::now();
        gateway.tick(now - last);
        last = now;

        match wake {
            Wake::Tick => {}
            Wake::Command(None) => break,
            Wake::Command(Some(Command::Connect {
                session,
                hello,
                outbound,
            })) => {
                sessions.insert(session, outbound);
                if gateway.connect(session, &hello) {
                    info!("Session {} admitted", session);
                }
            }
            Wake::Command(Some(Command::Line { session, line })) => {
                gateway.handle_line(session, &line);
            }
            Wake::Command(Some(Command::Disconnect { session })) => {
                sessions.remove(&session);
                gateway.disconnect(session);
            }
        }

        route(&mut sessions, gateway.drain());
    }
    info!("Game loop stopped");
}

/// Delivers outbound events to the sessions they address.
fn route(sessions: &mut HashMap<PlayerId, UnboundedSender<String>>, outbox: Vec<Outbound>) {
    for item in outbox {
        match item {
            Outbound::Event { to, event } => {
                let line = match WireMessage::new(&event).to_line() {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Failed to encode {} event: {}", event.name(), e);
                        continue;
                    }
                };
                for (session, outbound) in sessions.iter() {
                    if to.includes(*session) {
                        // A closed receiver means the connection is already gone
                        let _ = outbound.send(line.clone());
                    }
                }
            }
            Outbound::Close(session) => {
                // Dropping the sender ends the session's write loop
                sessions.remove(&session);
            }
        }
    }
}

/// Runs one client connection: hello first, then intents in and events out.
async fn serve_session<S>(stream: S, commands: UnboundedSender<Command>) -> TacticaResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();

    let Some(first) = lines.next_line().await? else {
        return Ok(());
    };
    let session = new_player_id();
    let (outbound, mut outgoing) = mpsc::unbounded_channel::<String>();
    commands
        .send(Command::Connect {
            session,
            hello: parse_hello(&first),
            outbound,
        })
        .map_err(|_| TacticaError::InvalidState("game loop stopped".to_string()))?;

    let result = pump(&mut lines, &mut write, &mut outgoing, &commands, session).await;
    // Ignored when the game loop is already gone
    let _ = commands.send(Command::Disconnect { session });
    if let Err(e) = write.shutdown().await {
        debug!("Shutdown of session {} failed: {}", session, e);
    }
    debug!("Session {} closed", session);
    result
}

async fn pump<R, W>(
    lines: &mut tokio::io::Lines<BufReader<R>>,
    write: &mut W,
    outgoing: &mut UnboundedReceiver<String>,
    commands: &UnboundedSender<Command>,
    session: PlayerId,
) -> TacticaResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            line = outgoing.recv() => match line {
                Some(line) => {
                    write.write_all(line.as_bytes()).await?;
                    write.write_all(b"\n").await?;
                    write.flush().await?;
                }
                None => return Ok(()),
            },
            incoming = lines.next_line() => match incoming? {
                Some(line) => {
                    if commands.send(Command::Line { session, line }).is_err() {
                        return Ok(());
                    }
                }
                None => return Ok(()),
            },
        }
    }
}
