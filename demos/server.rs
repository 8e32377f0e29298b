//! Accepts TCP connections, strips an optional PROXY protocol header and echoes
//! the first line of the remaining stream along with the client's original address.
//!
//! ```sh
//! RUST_LOG=trace cargo run --example server -- 127.0.0.1:7000
//! printf 'PROXY TCP4 10.0.0.1 10.0.0.2 4000 80\r\nhello\r\n' | nc 127.0.0.1 7000
//! ```

use proxyproto::{read_header, Error, PeekReader};
use std::env;
use std::io::{self, BufRead, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use tracing::{error, info, warn};

fn main() -> io::Result<()> {
    {
        use tracing_subscriber::{fmt, EnvFilter};
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).init();
    }

    let address = env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("127.0.0.1:7000"));
    let listener = TcpListener::bind(&address)?;

    info!(%address, "listening");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                thread::spawn(move || {
                    if let Err(error) = handle(stream) {
                        warn!(%error, "connection failed");
                    }
                });
            }
            Err(error) => error!(%error, "failed to accept connection"),
        }
    }

    Ok(())
}

fn handle(stream: TcpStream) -> io::Result<()> {
    let peer = stream.peer_addr()?;
    let mut writer = stream.try_clone()?;
    let mut reader = PeekReader::new(stream);

    let (client, proxied) = match read_header(&mut reader) {
        Ok(header) => (header.source().unwrap_or(peer), true),
        Err(Error::NoProxyProtocol) => (peer, false),
        Err(Error::Io(error)) => return Err(error),
        Err(error) => {
            warn!(%peer, %error, "closing connection with an invalid header");
            return Ok(());
        }
    };

    info!(%peer, %client, proxied, "accepted connection");

    let mut line = String::new();
    reader.read_line(&mut line)?;

    write!(writer, "{} said {}", client, line)
}
