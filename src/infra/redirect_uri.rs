//! One-shot HTTP listener that catches the OAuth redirect on localhost
//! and hands the full callback URL back to the auth flow.

use std::{
  io::prelude::*,
  net::{TcpListener, TcpStream},
};

/// Blocks until one well-formed request lands on the port, answers it
/// with a small page, and returns the full callback URL.
pub fn redirect_uri_web_server(port: u16) -> Result<String, ()> {
  let listener = match TcpListener::bind(format!("127.0.0.1:{}", port)) {
    Ok(listener) => listener,
    Err(e) => {
      println!("Error: {}", e);
      return Err(());
    }
  };

  for stream in listener.incoming() {
    match stream {
      Ok(stream) => {
        if let Some(url) = handle_connection(stream) {
          return Ok(url);
        }
      }
      Err(e) => {
        println!("Error: {}", e);
      }
    }
  }

  Err(())
}

fn handle_connection(mut stream: TcpStream) -> Option<String> {
  // Plenty for a redirect request with query string and headers
  let mut buffer = [0; 1000];
  if stream.read(&mut buffer).is_err() {
    return None;
  }

  let request = match String::from_utf8(buffer.to_vec()) {
    Ok(request) => request,
    Err(e) => {
      respond_with_error(format!("Invalid UTF-8 sequence: {}", e), stream);
      return None;
    }
  };

  let mut parts = request.split_whitespace();
  let path = match (parts.next(), parts.next()) {
    (Some(_method), Some(path)) => path,
    _ => {
      respond_with_error("Malformed request".to_string(), stream);
      return None;
    }
  };

  let host = request
    .lines()
    .find(|line| line.to_lowercase().starts_with("host:"))
    .and_then(|line| line.split(':').nth(1))
    .map(|h| h.trim())
    .unwrap_or("127.0.0.1:8888");

  let full_url = format!("http://{}{}", host, path);
  respond_with_success(stream);
  Some(full_url)
}

fn respond_with_success(mut stream: TcpStream) {
  let contents = include_str!("redirect_uri.html");
  let response = format!(
    "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
    contents.len(),
    contents
  );
  let _ = stream.write_all(response.as_bytes());
  let _ = stream.flush();
  // Give the browser time to receive the response before closing
  std::thread::sleep(std::time::Duration::from_millis(100));
}

fn respond_with_error(error_message: String, mut stream: TcpStream) {
  println!("Error: {}", error_message);
  let body = format!("400 - Bad Request - {}", error_message);
  let response = format!(
    "HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
    body.len(),
    body
  );
  let _ = stream.write_all(response.as_bytes());
  let _ = stream.flush();
  std::thread::sleep(std::time::Duration::from_millis(100));
}
