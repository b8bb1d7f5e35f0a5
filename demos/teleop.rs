// Keyboard teleop: A/D pan, space stop, H home, I info, Q quit
//
// Talks to a running controller over its serial port and prints every
// status line it sends back.
//
// Usage: cargo run --example teleop -- [port]

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::info;

use pan_stepper::config::{DEFAULT_BAUDRATE, DEFAULT_PORT};
use pan_stepper::runtime::log_filter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();

    let port_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PORT.to_string());

    info!("Opening {} at {} baud", port_name, DEFAULT_BAUDRATE);
    let mut port = serialport::new(&port_name, DEFAULT_BAUDRATE)
        .timeout(Duration::from_millis(50))
        .open()?;

    info!("Controls: A/D=pan, space=stop, H=home, I=info, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&mut *port);
    disable_raw_mode()?;

    result
}

fn run_teleop(port: &mut dyn SerialPort) -> Result<(), Box<dyn std::error::Error>> {
    let mut line = Vec::new();

    loop {
        // Poll for key with 20ms timeout, then echo whatever the controller said
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let command = match code {
                    KeyCode::Char('a') if pressed => Some(b'L'),
                    KeyCode::Char('d') if pressed => Some(b'R'),
                    KeyCode::Char(' ') if pressed => Some(b'S'),
                    KeyCode::Char('h') if pressed => Some(b'H'),
                    KeyCode::Char('i') if pressed => Some(b'I'),
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    _ => None,
                };
                if let Some(byte) = command {
                    port.write_all(&[byte])?;
                    port.flush()?;
                }
            }
        }

        let waiting = port.bytes_to_read()? as usize;
        if waiting > 0 {
            let mut buf = vec![0u8; waiting];
            port.read_exact(&mut buf)?;
            for byte in buf {
                match byte {
                    b'\r' => {}
                    b'\n' => {
                        // Raw mode needs the explicit carriage return
                        print!("< {}\r\n", String::from_utf8_lossy(&line));
                        std::io::stdout().flush()?;
                        line.clear();
                    }
                    other => line.push(other),
                }
            }
        }
    }
}
