use std::sync::Arc;

use crate::protocol::{Request, Response};

pub mod in_memory;
pub mod tcp;

/// Writing half of a connection. Shared between the dialogue thread that
/// owns the connection and whoever broadcasts to it; each line is written
/// whole.
pub trait Sender: Send + Sync {
    fn send_line(&self, line: &str) -> anyhow::Result<()>;

    /// Shut the connection down in both directions.
    fn close(&self);

    fn send_request(&self, req: &Request) -> anyhow::Result<()> {
        self.send_line(&req.encode()?)
    }

    fn send_response(&self, resp: &Response) -> anyhow::Result<()> {
        self.send_line(&resp.encode()?)
    }
}

pub type Outbound = Arc<dyn Sender>;

/// One end of an established connection.
pub trait Connection: Send {
    /// Block until the next line arrives, without its terminator.
    fn recv(&mut self) -> anyhow::Result<String>;

    fn outbound(&self) -> Outbound;

    /// Peer description, for logs.
    fn peer(&self) -> String;
}

pub trait Listener: Send {
    fn accept(&mut self) -> anyhow::Result<Box<dyn Connection>>;

    /// Address clients should dial to reach this listener.
    fn local_addr(&self) -> String;
}

/// Something that can open and accept connections.
pub trait Network: Send + Sync {
    fn connect(&self, addr: &str) -> anyhow::Result<Box<dyn Connection>>;
    fn listen(&self, addr: &str) -> anyhow::Result<Box<dyn Listener>>;
}
