use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::config::PAYLOAD_MAX;
use crate::transport::{Connection, Listener, Network, Outbound, Sender};

/// Largest line accepted: status, verb and separators around a full payload.
pub const MAX_FRAME_SIZE: usize = PAYLOAD_MAX + 16;

fn map_io(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::BrokenPipe => anyhow!("Connection closed by peer"),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => anyhow!("Connection reset by peer"),
        _ => anyhow!("I/O error: {}", e),
    }
}

struct TcpWriter {
    stream: Mutex<TcpStream>,
}

impl Sender for TcpWriter {
    fn send_line(&self, line: &str) -> anyhow::Result<()> {
        if line.len() >= MAX_FRAME_SIZE {
            return Err(anyhow!(
                "Frame too large: {} bytes (max: {})",
                line.len(),
                MAX_FRAME_SIZE
            ));
        }
        let mut stream = self.stream.lock().map_err(|_| anyhow!("Writer lock poisoned"))?;
        let mut frame = String::with_capacity(line.len() + 1);
        frame.push_str(line);
        frame.push('\n');
        stream.write_all(frame.as_bytes()).map_err(map_io)?;
        stream.flush().map_err(map_io)
    }

    fn close(&self) {
        if let Ok(stream) = self.stream.lock() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Newline-framed connection over a TCP stream.
pub struct TcpConnection {
    reader: BufReader<TcpStream>,
    writer: Arc<TcpWriter>,
    peer: String,
}

impl TcpConnection {
    pub fn new(stream: TcpStream) -> anyhow::Result<Self> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".into());
        let write_half = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer: Arc::new(TcpWriter {
                stream: Mutex::new(write_half),
            }),
            peer,
        })
    }

    pub fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|e| anyhow!("Failed to connect to {}: {}", addr, e))?;
        stream.set_nodelay(true).ok();
        Self::new(stream)
    }
}

impl Connection for TcpConnection {
    fn recv(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = (&mut self.reader)
            .take(MAX_FRAME_SIZE as u64 + 1)
            .read_line(&mut line)
            .map_err(map_io)?;
        if read == 0 {
            return Err(anyhow!("Connection closed by peer"));
        }
        if !line.ends_with('\n') {
            if line.len() > MAX_FRAME_SIZE {
                return Err(anyhow!("Frame too large: more than {} bytes", MAX_FRAME_SIZE));
            }
            return Err(anyhow!("Connection closed by peer"));
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    fn outbound(&self) -> Outbound {
        self.writer.clone()
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}

pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    pub fn bind(addr: &str) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;
        Ok(Self { listener })
    }
}

impl Listener for TcpAcceptor {
    fn accept(&mut self) -> anyhow::Result<Box<dyn Connection>> {
        let (stream, _) = self.listener.accept()?;
        stream.set_nodelay(true).ok();
        Ok(Box::new(TcpConnection::new(stream)?))
    }

    fn local_addr(&self) -> String {
        self.listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_default()
    }
}

/// [`Network`] over real sockets. Addresses are `host:port`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpNetwork;

impl Network for TcpNetwork {
    fn connect(&self, addr: &str) -> anyhow::Result<Box<dyn Connection>> {
        Ok(Box::new(TcpConnection::connect(addr)?))
    }

    fn listen(&self, addr: &str) -> anyhow::Result<Box<dyn Listener>> {
        Ok(Box::new(TcpAcceptor::bind(addr)?))
    }
}
