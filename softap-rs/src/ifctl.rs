// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Interface Control Adapter.
//!
//! Issues interface configuration requests and vendor private commands to
//! the kernel through a datagram socket used purely as an ioctl handle. The
//! socket is opened once and owned for the adapter's lifetime; when it
//! cannot be opened the adapter still exists and every request reports
//! `ResourceUnavailable`.

use std::ffi::{c_char, c_short, c_ulong, c_void};
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;

use log::{debug, error, info};
use socket2::{Domain, Socket, Type};

use crate::error::{SoftapError, SoftapResult};
use libc::IFNAMSIZ;

use crate::params::validate_interface;
use crate::wext_sys::{
    iw_point, iw_priv_args, iwreq, IW_ESSID_MAX_SIZE, IW_MODE_INFRA, IW_MODE_MASTER, SIOCGIWPRIV,
    SIOCSIWESSID, SIOCSIWMODE,
};

// Entries that fit in a 4 KiB request buffer.
const PRIV_TABLE_LEN: usize = 4096 / std::mem::size_of::<iw_priv_args>();

/// Operating mode of a wireless interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceMode {
    /// Station (client) mode.
    Managed,
    /// Access point mode.
    Master,
}

/// One entry of a driver's private command table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateCommand {
    pub name: String,
    pub opcode: u32,
}

pub trait InterfaceControl {
    /// Whether the control handle was opened.
    fn is_available(&self) -> bool;

    /// The vendor private command table advertised by the driver of `interface`.
    fn private_commands(&self, interface: &str) -> SoftapResult<Vec<PrivateCommand>>;

    /// Resolves a symbolic vendor command to its opcode. The first exact
    /// name match wins.
    fn resolve_vendor_command(&self, interface: &str, name: &str) -> SoftapResult<u32> {
        self.private_commands(interface)?
            .into_iter()
            .find(|command| command.name == name)
            .map(|command| command.opcode)
            .ok_or_else(|| SoftapError::UnsupportedCommand {
                interface: interface.to_string(),
                name: name.to_string(),
            })
    }

    /// Sends `payload` as a NUL terminated string with private command `opcode`.
    fn send_private_command(&self, interface: &str, opcode: u32, payload: &str)
        -> SoftapResult<()>;

    fn set_mode(&self, interface: &str, mode: InterfaceMode) -> SoftapResult<()>;

    /// Sets the advertised network name. An empty name clears it.
    fn set_essid(&self, interface: &str, essid: &str) -> SoftapResult<()>;

    /// Brings the interface administratively up or down.
    fn set_up(&self, interface: &str, up: bool) -> SoftapResult<()>;

    /// Renames `from` to `to`. The kernel refuses while `from` is up or when
    /// `to` already exists.
    fn rename(&self, from: &str, to: &str) -> SoftapResult<()>;
}

impl<T: InterfaceControl + ?Sized> InterfaceControl for Rc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn private_commands(&self, interface: &str) -> SoftapResult<Vec<PrivateCommand>> {
        (**self).private_commands(interface)
    }

    fn resolve_vendor_command(&self, interface: &str, name: &str) -> SoftapResult<u32> {
        (**self).resolve_vendor_command(interface, name)
    }

    fn send_private_command(
        &self,
        interface: &str,
        opcode: u32,
        payload: &str,
    ) -> SoftapResult<()> {
        (**self).send_private_command(interface, opcode, payload)
    }

    fn set_mode(&self, interface: &str, mode: InterfaceMode) -> SoftapResult<()> {
        (**self).set_mode(interface, mode)
    }

    fn set_essid(&self, interface: &str, essid: &str) -> SoftapResult<()> {
        (**self).set_essid(interface, essid)
    }

    fn set_up(&self, interface: &str, up: bool) -> SoftapResult<()> {
        (**self).set_up(interface, up)
    }

    fn rename(&self, from: &str, to: &str) -> SoftapResult<()> {
        (**self).rename(from, to)
    }
}

/// Converts an interface name to the fixed size, NUL padded kernel form.
pub(crate) fn ifname(name: &str) -> SoftapResult<[c_char; IFNAMSIZ]> {
    validate_interface(name)?;
    let mut raw = [0 as c_char; IFNAMSIZ];
    for (dst, src) in raw.iter_mut().zip(name.bytes()) {
        *dst = src as c_char;
    }
    Ok(raw)
}

/// A zeroed `struct ifreq` addressed to `name`.
fn ifreq(name: [c_char; IFNAMSIZ]) -> libc::ifreq {
    // SAFETY: ifreq is plain old data for which all zero bytes is a valid value.
    let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
    ifr.ifr_name = name;
    ifr
}

/// Reads a NUL padded kernel name.
pub(crate) fn name_from_raw(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub struct WirelessSocket {
    socket: Option<Socket>,
}

impl WirelessSocket {
    /// Opens the AF_INET datagram socket used as the ioctl handle.
    pub fn open() -> WirelessSocket {
        match Socket::new(Domain::IPV4, Type::DGRAM, None) {
            Ok(socket) => WirelessSocket { socket: Some(socket) },
            Err(e) => {
                error!("Failed to open interface control socket: {e}");
                WirelessSocket { socket: None }
            }
        }
    }

    fn fd(&self) -> SoftapResult<RawFd> {
        self.socket.as_ref().map(|socket| socket.as_raw_fd()).ok_or_else(|| {
            SoftapError::unavailable(
                "interface control socket",
                io::Error::new(io::ErrorKind::NotConnected, "socket was not opened"),
            )
        })
    }

    /// Issues `request` with `arg` as its argument.
    fn ioctl<T>(
        &self,
        request: c_ulong,
        request_name: &'static str,
        interface: &str,
        arg: &mut T,
    ) -> SoftapResult<()> {
        let fd = self.fd()?;
        // SAFETY: `fd` is an open socket owned by `self`, and `arg` is a live,
        // exclusively borrowed `#[repr(C)]` request whose layout matches what
        // the kernel expects for `request`. Pointers embedded in `arg` refer to
        // buffers the caller keeps alive across this call.
        let ret = unsafe { libc::ioctl(fd, request as _, arg as *mut T) };
        if ret < 0 {
            return Err(SoftapError::Ioctl {
                request: request_name,
                interface: interface.to_string(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

impl InterfaceControl for WirelessSocket {
    fn is_available(&self) -> bool {
        self.socket.is_some()
    }

    fn private_commands(&self, interface: &str) -> SoftapResult<Vec<PrivateCommand>> {
        let name = ifname(interface)?;
        let mut table = vec![iw_priv_args::zeroed(); PRIV_TABLE_LEN];
        let mut wrq = iwreq::new(name);
        loop {
            wrq.u.data = iw_point {
                pointer: table.as_mut_ptr() as *mut c_void,
                length: table.len() as u16,
                flags: 0,
            };
            match self.ioctl(SIOCGIWPRIV, "SIOCGIWPRIV", interface, &mut wrq) {
                Ok(()) => break,
                Err(SoftapError::Ioctl { source, .. })
                    if source.raw_os_error() == Some(libc::E2BIG) =>
                {
                    // SAFETY: the kernel reports the required entry count in
                    // the `data` member on E2BIG.
                    let needed = usize::from(unsafe { wrq.u.data.length });
                    if needed <= table.len() {
                        return Err(SoftapError::Ioctl {
                            request: "SIOCGIWPRIV",
                            interface: interface.to_string(),
                            source,
                        });
                    }
                    debug!("{interface} advertises {needed} private commands, growing table");
                    table.resize(needed, iw_priv_args::zeroed());
                }
                Err(e) => return Err(e),
            }
        }
        // SAFETY: on success the kernel stores the entry count in `data`.
        let count = usize::from(unsafe { wrq.u.data.length }).min(table.len());
        Ok(table[..count]
            .iter()
            .map(|entry| PrivateCommand { name: name_from_raw(&entry.name), opcode: entry.cmd })
            .collect())
    }

    fn send_private_command(
        &self,
        interface: &str,
        opcode: u32,
        payload: &str,
    ) -> SoftapResult<()> {
        let mut buf = Vec::with_capacity(payload.len() + 1);
        buf.extend_from_slice(payload.as_bytes());
        buf.push(0);
        let length = u16::try_from(buf.len()).map_err(|_| SoftapError::CommandTooLong {
            capacity: usize::from(u16::MAX),
            required: buf.len(),
        })?;

        let mut wrq = iwreq::new(ifname(interface)?);
        wrq.u.data = iw_point { pointer: buf.as_mut_ptr() as *mut c_void, length, flags: 0 };
        self.ioctl(c_ulong::from(opcode), "private command", interface, &mut wrq)?;
        debug!("{interface}: private command {opcode:#x} accepted");
        Ok(())
    }

    fn set_mode(&self, interface: &str, mode: InterfaceMode) -> SoftapResult<()> {
        let mut wrq = iwreq::new(ifname(interface)?);
        wrq.u.mode = match mode {
            InterfaceMode::Managed => IW_MODE_INFRA,
            InterfaceMode::Master => IW_MODE_MASTER,
        };
        self.ioctl(SIOCSIWMODE, "SIOCSIWMODE", interface, &mut wrq)?;
        info!("{interface}: mode set to {mode:?}");
        Ok(())
    }

    fn set_essid(&self, interface: &str, essid: &str) -> SoftapResult<()> {
        if essid.len() > IW_ESSID_MAX_SIZE {
            return Err(SoftapError::InvalidArgument(format!(
                "ESSID longer than {IW_ESSID_MAX_SIZE} bytes"
            )));
        }
        let mut buf = [0u8; IW_ESSID_MAX_SIZE + 1];
        buf[..essid.len()].copy_from_slice(essid.as_bytes());

        let mut wrq = iwreq::new(ifname(interface)?);
        wrq.u.essid = iw_point {
            pointer: buf.as_mut_ptr() as *mut c_void,
            length: essid.len() as u16,
            flags: u16::from(!essid.is_empty()),
        };
        self.ioctl(SIOCSIWESSID, "SIOCSIWESSID", interface, &mut wrq)?;
        debug!("{interface}: ESSID set to {essid:?}");
        Ok(())
    }

    fn set_up(&self, interface: &str, up: bool) -> SoftapResult<()> {
        let mut ifr = ifreq(ifname(interface)?);
        self.ioctl(libc::SIOCGIFFLAGS as c_ulong, "SIOCGIFFLAGS", interface, &mut ifr)?;
        // SAFETY: SIOCGIFFLAGS filled in the flags member.
        let flags = unsafe { ifr.ifr_ifru.ifru_flags };
        let iff_up = libc::IFF_UP as c_short;
        ifr.ifr_ifru.ifru_flags = if up { flags | iff_up } else { flags & !iff_up };
        self.ioctl(libc::SIOCSIFFLAGS as c_ulong, "SIOCSIFFLAGS", interface, &mut ifr)
    }

    fn rename(&self, from: &str, to: &str) -> SoftapResult<()> {
        let mut ifr = ifreq(ifname(from)?);
        ifr.ifr_ifru.ifru_newname = ifname(to)?;
        self.ioctl(libc::SIOCSIFNAME as c_ulong, "SIOCSIFNAME", from, &mut ifr)?;
        info!("Renamed interface {from} to {to}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocked::FakeInterfaceControl;

    #[test]
    fn test_ifname() {
        let raw = ifname("wlan0").unwrap();
        assert_eq!(name_from_raw(&raw), "wlan0");
        assert_eq!(raw[5], 0);
        assert!(ifname("").is_err());
        assert!(ifname("sixteen_chars_xx").is_err());
        assert!(ifname("fifteen_chars_x").is_ok());
        assert!(ifname("wl\0x").is_err());
        assert!(ifname("wl/0").is_err());
    }

    #[test]
    fn test_resolve_first_exact_match() {
        let ifctl = FakeInterfaceControl::with_commands(&[
            ("AP_BSS_START_EXT", 0x8BF1),
            ("AP_BSS_START", 0x8BF2),
            ("AP_BSS_START", 0x8BF3),
        ]);
        assert_eq!(ifctl.resolve_vendor_command("wlan0", "AP_BSS_START").unwrap(), 0x8BF2);
    }

    #[test]
    fn test_resolve_unknown_command() {
        let ifctl = FakeInterfaceControl::with_commands(&[("AP_SET_CFG", 0x8BE2)]);
        let err = ifctl.resolve_vendor_command("wlan0", "WL_FW_RELOAD").unwrap_err();
        assert!(matches!(err, SoftapError::UnsupportedCommand { .. }));
    }

    #[test]
    fn test_closed_socket_reports_unavailable() {
        let socket = WirelessSocket { socket: None };
        assert!(!socket.is_available());
        let err = socket.set_mode("wlan0", InterfaceMode::Managed).unwrap_err();
        assert!(matches!(err, SoftapError::ResourceUnavailable { .. }));
    }

    #[test]
    fn test_unknown_interface_fails_atomically() {
        let socket = WirelessSocket::open();
        if !socket.is_available() {
            return;
        }
        let err = socket.set_essid("softapnone0", "").unwrap_err();
        assert!(matches!(err, SoftapError::Ioctl { request: "SIOCSIWESSID", .. }));
    }
}
