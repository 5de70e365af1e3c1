//! Serial transport HAL. The interface is the contract — the physical
//! transport is deliberately out of scope for the core crate, specified
//! only at its interface; `vnsdk` nonetheless ships one concrete
//! implementation over the `serialport` crate, feature-gated behind
//! `serial` so the core parsing/dispatch/command code never hard-depends
//! on a physical port.

use crate::error::Error;
use std::time::Duration;

/// What the rest of the crate needs from a serial connection.
pub trait SerialTransport: Send {
    fn open(&mut self, port: &str, baud: u32) -> Result<(), Error>;
    fn close(&mut self) -> Result<(), Error>;
    fn change_baud(&mut self, baud: u32) -> Result<(), Error>;
    fn is_supported_baud(&self, baud: u32) -> bool;
    /// Reads whatever is available right now (non-blocking beyond a short
    /// internal poll), appending to `dst`. Returns the number of bytes read.
    fn get_data(&mut self, dst: &mut Vec<u8>) -> Result<usize, Error>;
    fn send(&mut self, bytes: &[u8]) -> Result<(), Error>;
    fn connected_port_name(&self) -> Option<&str>;
    fn connected_baud(&self) -> Option<u32>;
}

/// An in-memory transport for tests: pre-load bytes the "sensor" would
/// have sent with `push_incoming`, and inspect bytes the façade sent via
/// `sent()`.
#[cfg(any(test, feature = "test-util"))]
pub struct MockTransport {
    port_name: Option<String>,
    baud: Option<u32>,
    supported_bauds: Vec<u32>,
    incoming: std::collections::VecDeque<u8>,
    outgoing: Vec<u8>,
    open: bool,
    /// Fires synchronously on every `send` (passed the bytes sent and the
    /// baud rate currently in effect), letting tests built on `FakeClock`
    /// (which never really waits) exercise a full request/reply round trip
    /// without a second thread driving the "sensor" side.
    #[allow(clippy::type_complexity)]
    responder: Option<Box<dyn FnMut(&[u8], u32) -> Option<Vec<u8>> + Send>>,
}

#[cfg(any(test, feature = "test-util"))]
impl MockTransport {
    pub fn new(supported_bauds: &[u32]) -> Self {
        Self {
            port_name: None,
            baud: None,
            supported_bauds: supported_bauds.to_vec(),
            incoming: std::collections::VecDeque::new(),
            outgoing: Vec::new(),
            open: false,
            responder: None,
        }
    }

    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    pub fn sent(&self) -> &[u8] {
        &self.outgoing
    }

    pub fn clear_sent(&mut self) {
        self.outgoing.clear();
    }

    /// Installs a responder invoked with every outbound message and the baud
    /// rate currently in effect; whatever it returns is queued as the next
    /// bytes `get_data` will yield.
    pub fn set_responder(&mut self, responder: impl FnMut(&[u8], u32) -> Option<Vec<u8>> + Send + 'static) {
        self.responder = Some(Box::new(responder));
    }
}

#[cfg(any(test, feature = "test-util"))]
impl SerialTransport for MockTransport {
    fn open(&mut self, port: &str, baud: u32) -> Result<(), Error> {
        if !self.is_supported_baud(baud) {
            return Err(Error::UnsupportedBaudRate(baud));
        }
        self.port_name = Some(port.to_string());
        self.baud = Some(baud);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.open = false;
        Ok(())
    }

    fn change_baud(&mut self, baud: u32) -> Result<(), Error> {
        if !self.open {
            return Err(Error::SerialPortClosed);
        }
        if !self.is_supported_baud(baud) {
            return Err(Error::UnsupportedBaudRate(baud));
        }
        self.baud = Some(baud);
        Ok(())
    }

    fn is_supported_baud(&self, baud: u32) -> bool {
        self.supported_bauds.contains(&baud)
    }

    fn get_data(&mut self, dst: &mut Vec<u8>) -> Result<usize, Error> {
        if !self.open {
            return Err(Error::SerialPortClosed);
        }
        let n = self.incoming.len();
        dst.extend(self.incoming.drain(..));
        Ok(n)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if !self.open {
            return Err(Error::SerialPortClosed);
        }
        self.outgoing.extend_from_slice(bytes);
        if let Some(responder) = &mut self.responder {
            if let Some(reply) = responder(bytes, self.baud.unwrap_or(0)) {
                self.incoming.extend(reply);
            }
        }
        Ok(())
    }

    fn connected_port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    fn connected_baud(&self) -> Option<u32> {
        self.baud
    }
}

/// Production transport over the `serialport` crate.
#[cfg(feature = "serial")]
pub struct SerialPortTransport {
    port: Option<Box<dyn serialport::SerialPort>>,
    port_name: Option<String>,
    baud: Option<u32>,
    read_timeout: Duration,
}

#[cfg(feature = "serial")]
impl SerialPortTransport {
    pub fn new(read_timeout: Duration) -> Self {
        Self { port: None, port_name: None, baud: None, read_timeout }
    }
}

#[cfg(feature = "serial")]
impl SerialTransport for SerialPortTransport {
    fn open(&mut self, port: &str, baud: u32) -> Result<(), Error> {
        let built = serialport::new(port, baud)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| match e.kind {
                serialport::ErrorKind::NoDevice => Error::InvalidPortName,
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => Error::AccessDenied,
                _ => Error::UnexpectedSerialError,
            })?;
        self.port = Some(built);
        self.port_name = Some(port.to_string());
        self.baud = Some(baud);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.port = None;
        self.port_name = None;
        self.baud = None;
        Ok(())
    }

    fn change_baud(&mut self, baud: u32) -> Result<(), Error> {
        let port = self.port.as_mut().ok_or(Error::SerialPortClosed)?;
        port.set_baud_rate(baud).map_err(|_| Error::UnsupportedBaudRate(baud))?;
        self.baud = Some(baud);
        Ok(())
    }

    fn is_supported_baud(&self, baud: u32) -> bool {
        crate::config::SUPPORTED_BAUD_RATES.contains(&baud)
    }

    fn get_data(&mut self, dst: &mut Vec<u8>) -> Result<usize, Error> {
        use std::io::Read;
        let port = self.port.as_mut().ok_or(Error::SerialPortClosed)?;
        let available = port.bytes_to_read().unwrap_or(0) as usize;
        if available == 0 {
            return Ok(0);
        }
        let start = dst.len();
        dst.resize(start + available, 0);
        match port.read(&mut dst[start..]) {
            Ok(n) => {
                dst.truncate(start + n);
                Ok(n)
            },
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                dst.truncate(start);
                Ok(0)
            },
            Err(_) => {
                dst.truncate(start);
                Err(Error::SerialReadFailed)
            },
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        use std::io::Write;
        let port = self.port.as_mut().ok_or(Error::SerialPortClosed)?;
        port.write_all(bytes).map_err(|_| Error::SerialWriteFailed)
    }

    fn connected_port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    fn connected_baud(&self) -> Option<u32> {
        self.baud
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_transport_rejects_unsupported_baud() {
        let mut t = MockTransport::new(&[115_200]);
        assert_eq!(t.open("COM3", 9600).unwrap_err(), Error::UnsupportedBaudRate(9600));
    }

    #[test]
    fn mock_transport_round_trips_bytes() {
        let mut t = MockTransport::new(&[115_200]);
        t.open("COM3", 115_200).unwrap();
        t.push_incoming(b"$VNYPR*5E\r\n");
        let mut dst = Vec::new();
        let n = t.get_data(&mut dst).unwrap();
        assert_eq!(n, 11);
        assert_eq!(dst, b"$VNYPR*5E\r\n");

        t.send(b"$VNRRG,01*").unwrap();
        assert_eq!(t.sent(), b"$VNRRG,01*");
    }

    #[test]
    fn get_data_on_closed_transport_errors() {
        let mut t = MockTransport::new(&[115_200]);
        let mut dst = Vec::new();
        assert_eq!(t.get_data(&mut dst).unwrap_err(), Error::SerialPortClosed);
    }
}
