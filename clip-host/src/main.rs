//! Native messaging host: thin relay to the clipboard dispatcher
//!
//! Receives length-prefixed JSON messages from the browser on stdin, forwards
//! each one to the dispatcher socket as a line of JSON and writes the reply
//! back in the same framing.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

const DEFAULT_SOCKET_PATH: &str = "/tmp/syncopy.sock";
const SOCKET_ENV: &str = "SYNCOPY_SOCKET";
const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Browsers cap messages to the host at 1 MiB
const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

fn socket_path() -> String {
    std::env::var(SOCKET_ENV)
        .ok()
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| DEFAULT_SOCKET_PATH.to_string())
}

/// Read a native messaging message from stdin
fn read_message(input: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut length_bytes = [0u8; 4];

    match input.read_exact(&mut length_bytes) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let length = u32::from_ne_bytes(length_bytes) as usize;
    if length == 0 {
        return Ok(None);
    }
    if length > MAX_MESSAGE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message of {} bytes exceeds the {} byte limit", length, MAX_MESSAGE_BYTES),
        ));
    }

    let mut message = vec![0u8; length];
    input.read_exact(&mut message)?;

    Ok(Some(message))
}

/// Write a native messaging message to stdout
fn write_message(output: &mut impl Write, message: &[u8]) -> io::Result<()> {
    let length = message.len() as u32;
    let length_bytes = length.to_ne_bytes();

    output.write_all(&length_bytes)?;
    output.write_all(message)?;
    output.flush()?;

    Ok(())
}

/// Forward message to the dispatcher via Unix socket
fn forward_to_service(socket_path: &str, message: &[u8]) -> io::Result<Vec<u8>> {
    let mut stream = UnixStream::connect(socket_path)?;
    stream.set_read_timeout(Some(SOCKET_TIMEOUT))?;
    stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;

    // Send message with newline delimiter
    stream.write_all(message)?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    // Read response (newline-delimited JSON)
    let mut response = Vec::new();
    BufReader::new(stream).read_until(b'\n', &mut response)?;
    if response.last() == Some(&b'\n') {
        response.pop();
    }
    if response.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "dispatcher closed the connection without replying",
        ));
    }

    Ok(response)
}

/// `{success: false, error}` reply for the browser
fn error_response(message: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "success": false,
        "error": message,
    }))
    .unwrap_or_else(|_| br#"{"success":false}"#.to_vec())
}

fn main() {
    let socket_path = socket_path();
    eprintln!("Native host started, relaying to {}", socket_path);

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    // Main message loop
    loop {
        match read_message(&mut stdin) {
            Ok(Some(message)) => {
                eprintln!("Received {} bytes from extension", message.len());

                let response = match forward_to_service(&socket_path, &message) {
                    Ok(resp) => {
                        eprintln!("Service response: {} bytes", resp.len());
                        resp
                    }
                    Err(e) => {
                        eprintln!("Service error: {}", e);
                        error_response(&format!("Service unavailable: {}", e))
                    }
                };

                if let Err(e) = write_message(&mut stdout, &response) {
                    eprintln!("Failed to write response: {}", e);
                    break;
                }
            }
            Ok(None) => {
                eprintln!("Connection closed");
                break;
            }
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
}
