//! Support for the end-to-end tests: a fixture network served by the router
//! emulation, and scripted peers for situations a well-behaved router never produces.
use std::{
    io::{BufRead, BufReader, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    path::PathBuf,
    sync::Arc,
    thread,
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use helvar_client::Client;
use helvar_router::{
    network::Network,
    server::{Config, Server},
};

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("test_net.yml")
}

pub fn network() -> Network {
    Network::from_yaml_file(fixture_path()).expect("fixture network is valid")
}

/// Serves the fixture network on an ephemeral local port.
pub fn spawn_router(config: Config) -> SocketAddr {
    Server::new(network(), config)
        .spawn("127.0.0.1:0")
        .expect("router can bind to localhost")
}

/// A client for a router at `addr`, not yet connected.
pub fn client(addr: SocketAddr) -> Client {
    Client::new(&addr.ip().to_string(), addr.port())
}

/// A TCP peer that records every frame it receives and answers with a script.
pub struct ScriptedPeer {
    pub addr: SocketAddr,
    /// Every frame received, on any connection, in arrival order
    pub frames: Receiver<String>,
}

impl ScriptedPeer {
    /// Accepts any number of connections. `respond` is called for each received
    /// frame; the bytes it returns, if any, are written back verbatim.
    pub fn spawn<F>(respond: F) -> ScriptedPeer
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("peer can bind to localhost");
        let addr = listener.local_addr().expect("peer has a local address");
        let (frames, frames_rx) = unbounded();
        let respond = Arc::new(respond);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let frames = frames.clone();
                let respond = Arc::clone(&respond);
                thread::spawn(move || serve(stream, &frames, &*respond));
            }
        });

        ScriptedPeer {
            addr,
            frames: frames_rx,
        }
    }

    /// A peer that reads everything and never answers.
    pub fn silent() -> ScriptedPeer {
        ScriptedPeer::spawn(|_| None)
    }
}

fn serve(
    mut stream: TcpStream,
    frames: &Sender<String>,
    respond: &(dyn Fn(&str) -> Option<String> + Send + Sync),
) {
    let Ok(read) = stream.try_clone() else { return };
    let mut reader = BufReader::new(read);
    loop {
        let mut buf = Vec::new();
        match reader.read_until(b'#', &mut buf) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let frame = String::from_utf8_lossy(&buf).to_string();
        if frames.send(frame.clone()).is_err() {
            return;
        }
        if let Some(answer) = respond(&frame) {
            if stream.write_all(answer.as_bytes()).is_err() {
                return;
            }
        }
    }
}

/// A listener that accepts connections and closes them straight away.
pub fn hang_up_peer() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("peer can bind to localhost");
    let addr = listener.local_addr().expect("peer has a local address");
    thread::spawn(move || {
        for stream in listener.incoming() {
            drop(stream);
        }
    });
    addr
}

/// An address nothing listens on.
pub fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("can bind to localhost");
    listener.local_addr().expect("listener has a local address")
}
