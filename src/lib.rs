//! Host side SD/MMC card engine.
//!
//! Brings a card from power-up to the transfer state through a host
//! controller driver implementing [`SdmmcHostDevice`], then moves 512 byte
//! blocks in and out of it.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod regs;

pub mod bus;
pub mod card;
pub mod constants;
pub mod disk;
pub mod err;
pub mod host;
pub mod mmc;
pub mod sd;
pub mod tools;

#[cfg(test)]
pub(crate) mod sim;

pub use card::{AddressingMode, CardType};
pub use disk::{DiskCard, DiskError, DiskIoctl, DiskStatus, SdmmcDisk};
pub use err::{HostError, HostStatus, SdmmcError, SdmmcResult};
pub use host::{EndianMode, HostBusWidth, HostCapability, HostConfig, SdmmcHost, SdmmcHostDevice};
pub use mmc::{AccessPartition, BootConfig, MmcCard};
pub use sd::SdCard;
