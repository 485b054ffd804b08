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

//! Kernel ABI of the Linux wireless extensions, following
//! `<linux/wireless.h>`. Interface requests (`struct ifreq`, `SIOC*IF*`) come
//! from `libc`, which does not carry these.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_ulong, c_void};

use libc::IFNAMSIZ;

pub const SIOCSIWMODE: c_ulong = 0x8B06;
pub const SIOCGIWPRIV: c_ulong = 0x8B0D;
pub const SIOCSIWESSID: c_ulong = 0x8B1A;

pub const IW_MODE_INFRA: u32 = 2;
pub const IW_MODE_MASTER: u32 = 3;
pub const IW_ESSID_MAX_SIZE: usize = 32;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct iw_point {
    pub pointer: *mut c_void,
    pub length: u16,
    pub flags: u16,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union iwreq_data {
    pub name: [c_char; IFNAMSIZ],
    pub essid: iw_point,
    pub data: iw_point,
    pub mode: u32,
}

#[repr(C)]
pub struct iwreq {
    pub ifr_name: [c_char; IFNAMSIZ],
    pub u: iwreq_data,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct iw_priv_args {
    pub cmd: u32,
    pub set_args: u16,
    pub get_args: u16,
    pub name: [c_char; IFNAMSIZ],
}

impl iwreq {
    pub fn new(ifname: [c_char; IFNAMSIZ]) -> iwreq {
        iwreq { ifr_name: ifname, u: iwreq_data { name: [0; IFNAMSIZ] } }
    }
}

impl iw_priv_args {
    pub const fn zeroed() -> iw_priv_args {
        iw_priv_args { cmd: 0, set_args: 0, get_args: 0, name: [0; IFNAMSIZ] }
    }
}
