//! Block device view of a card, numbered the way a FAT layer numbers its
//! physical drives.

use bitflags::bitflags;
use kspin::SpinRaw;
use log::{info, warn};

use crate::card::CardType;
use crate::err::{SdmmcError, SdmmcResult};
use crate::host::SdmmcHostDevice;
use crate::mmc::MmcCard;
use crate::sd::SdCard;

/// What the adapter needs from a card.
pub trait DiskCard {
    fn card_type(&self) -> CardType;
    fn init(&mut self) -> SdmmcResult;
    fn deinit(&mut self) -> SdmmcResult;
    fn read_blocks(&mut self, buffer: &mut [u8], start_block: u32, block_count: u32) -> SdmmcResult;
    fn write_blocks(&mut self, buffer: &[u8], start_block: u32, block_count: u32) -> SdmmcResult;
    fn wait_write_complete(&mut self) -> SdmmcResult;
    /// Blocks reachable by data commands.
    fn block_count(&self) -> u32;
    fn block_size(&self) -> u32;
    /// Erase granularity in blocks.
    fn erase_unit_blocks(&self) -> u32;
    fn is_read_only(&self) -> bool;
}

impl<D: SdmmcHostDevice> DiskCard for SdCard<D> {
    fn card_type(&self) -> CardType {
        CardType::Sd
    }

    fn init(&mut self) -> SdmmcResult {
        SdCard::init(self)
    }

    fn deinit(&mut self) -> SdmmcResult {
        SdCard::deinit(self)
    }

    fn read_blocks(&mut self, buffer: &mut [u8], start_block: u32, block_count: u32) -> SdmmcResult {
        SdCard::read_blocks(self, buffer, start_block, block_count)
    }

    fn write_blocks(&mut self, buffer: &[u8], start_block: u32, block_count: u32) -> SdmmcResult {
        SdCard::write_blocks(self, buffer, start_block, block_count)
    }

    fn wait_write_complete(&mut self) -> SdmmcResult {
        SdCard::wait_write_complete(self)
    }

    fn block_count(&self) -> u32 {
        SdCard::block_count(self)
    }

    fn block_size(&self) -> u32 {
        SdCard::block_size(self)
    }

    fn erase_unit_blocks(&self) -> u32 {
        self.erase_sector_blocks()
    }

    fn is_read_only(&self) -> bool {
        self.check_read_only()
    }
}

impl<D: SdmmcHostDevice> DiskCard for MmcCard<D> {
    fn card_type(&self) -> CardType {
        CardType::Mmc
    }

    fn init(&mut self) -> SdmmcResult {
        MmcCard::init(self)
    }

    fn deinit(&mut self) -> SdmmcResult {
        MmcCard::deinit(self)
    }

    fn read_blocks(&mut self, buffer: &mut [u8], start_block: u32, block_count: u32) -> SdmmcResult {
        MmcCard::read_blocks(self, buffer, start_block, block_count)
    }

    fn write_blocks(&mut self, buffer: &[u8], start_block: u32, block_count: u32) -> SdmmcResult {
        MmcCard::write_blocks(self, buffer, start_block, block_count)
    }

    fn wait_write_complete(&mut self) -> SdmmcResult {
        MmcCard::wait_write_complete(self)
    }

    fn block_count(&self) -> u32 {
        self.partition_blocks()
    }

    fn block_size(&self) -> u32 {
        MmcCard::block_size(self)
    }

    fn erase_unit_blocks(&self) -> u32 {
        self.erase_group_blocks()
    }

    fn is_read_only(&self) -> bool {
        self.check_read_only()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// The card failed the request.
    Error,
    /// Wrong drive, or a block range the card does not have.
    ParameterError,
    NotInitialized,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DiskStatus: u8 {
        const NOT_INITIALIZED = 1 << 0;
        const WRITE_PROTECTED = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskIoctl {
    GetSectorCount,
    GetSectorSize,
    /// Erase unit, in sectors.
    GetBlockSize,
    /// Waits for pending writes to be programmed.
    Sync,
}

struct DiskState<C> {
    card: C,
    initialized: bool,
    last_error: Option<SdmmcError>,
}

impl<C: DiskCard> DiskState<C> {
    fn record(&mut self, drive: u8, err: SdmmcError) -> DiskError {
        warn!("drive {}: {:?} card error: {}", drive, self.card.card_type(), err);
        self.last_error = Some(err);
        match err {
            SdmmcError::InvalidArgument => DiskError::ParameterError,
            _ => DiskError::Error,
        }
    }
}

/// One physical drive backed by one card.
pub struct SdmmcDisk<C: DiskCard> {
    drive: u8,
    state: SpinRaw<DiskState<C>>,
}

impl<C: DiskCard> SdmmcDisk<C> {
    pub fn new(drive: u8, card: C) -> Self {
        SdmmcDisk {
            drive,
            state: SpinRaw::new(DiskState {
                card,
                initialized: false,
                last_error: None,
            }),
        }
    }

    pub fn drive(&self) -> u8 {
        self.drive
    }

    pub fn into_card(self) -> C {
        self.state.into_inner().card
    }

    /// Runs `f` on the card with the drive locked.
    pub fn with_card<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.state.lock().card)
    }

    /// Last card error seen by any operation.
    pub fn last_error(&self) -> Option<SdmmcError> {
        self.state.lock().last_error
    }

    fn check_drive(&self, drive: u8) -> Result<(), DiskError> {
        if drive != self.drive {
            return Err(DiskError::ParameterError);
        }
        Ok(())
    }

    pub fn initialize(&self, drive: u8) -> Result<(), DiskError> {
        self.check_drive(drive)?;

        let mut state = self.state.lock();
        if let Err(err) = state.card.init() {
            state.record(drive, err);
            if let Err(err) = state.card.deinit() {
                warn!("drive {}: release after failed init: {}", drive, err);
            }
            state.initialized = false;
            return Err(DiskError::NotInitialized);
        }

        state.initialized = true;
        info!(
            "drive {}: {:?} card, {} sectors of {} bytes",
            drive,
            state.card.card_type(),
            state.card.block_count(),
            state.card.block_size()
        );
        Ok(())
    }

    pub fn status(&self, drive: u8) -> Result<DiskStatus, DiskError> {
        if drive != self.drive {
            return Err(DiskError::NotInitialized);
        }

        let state = self.state.lock();
        let mut status = DiskStatus::empty();
        if !state.initialized {
            status |= DiskStatus::NOT_INITIALIZED;
        }
        if state.card.is_read_only() {
            status |= DiskStatus::WRITE_PROTECTED;
        }
        Ok(status)
    }

    pub fn read_blocks(
        &self,
        drive: u8,
        buffer: &mut [u8],
        start_block: u32,
        block_count: u32,
    ) -> Result<(), DiskError> {
        self.check_drive(drive)?;

        let mut state = self.state.lock();
        if !state.initialized {
            return Err(DiskError::NotInitialized);
        }
        state
            .card
            .read_blocks(buffer, start_block, block_count)
            .map_err(|err| state.record(drive, err))
    }

    pub fn write_blocks(
        &self,
        drive: u8,
        buffer: &[u8],
        start_block: u32,
        block_count: u32,
    ) -> Result<(), DiskError> {
        self.check_drive(drive)?;

        let mut state = self.state.lock();
        if !state.initialized {
            return Err(DiskError::NotInitialized);
        }
        state
            .card
            .write_blocks(buffer, start_block, block_count)
            .map_err(|err| state.record(drive, err))
    }

    /// Answers a control request. `Sync` answers 0 once writes are programmed.
    pub fn ioctl(&self, drive: u8, request: DiskIoctl) -> Result<u32, DiskError> {
        self.check_drive(drive)?;

        let mut state = self.state.lock();
        if !state.initialized {
            return Err(DiskError::NotInitialized);
        }
        match request {
            DiskIoctl::GetSectorCount => Ok(state.card.block_count()),
            DiskIoctl::GetSectorSize => Ok(state.card.block_size()),
            DiskIoctl::GetBlockSize => Ok(state.card.erase_unit_blocks()),
            DiskIoctl::Sync => state
                .card
                .wait_write_complete()
                .map(|_| 0)
                .map_err(|err| state.record(drive, err)),
        }
    }

    /// Deselects the card. Releasing an already released drive deselects again.
    pub fn deinitialize(&self, drive: u8) -> Result<(), DiskError> {
        self.check_drive(drive)?;

        let mut state = self.state.lock();
        state.initialized = false;
        state.card.deinit().map_err(|err| state.record(drive, err))
    }
}
