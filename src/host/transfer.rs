/// Response shape the host must expect for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    None,
    R1,
    /// R1 followed by a busy signal on DAT0.
    R1b,
    R2,
    R3,
    R4,
    R5,
    R5b,
    R6,
    R7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Normal,
    Suspend,
    Resume,
    Abort,
}

#[derive(Debug, Clone)]
pub struct HostCmd {
    pub index: u32,
    pub argument: u32,
    pub response_type: ResponseType,
    pub cmd_type: CommandType,
    pub response: [u32; 4],
}

impl HostCmd {
    pub fn new(index: u32, argument: u32, response_type: ResponseType) -> Self {
        Self {
            index,
            argument,
            response_type,
            cmd_type: CommandType::Normal,
            response: [0; 4],
        }
    }

    pub fn with_type(mut self, cmd_type: CommandType) -> Self {
        self.cmd_type = cmd_type;
        self
    }

    pub fn r1(&self) -> u32 {
        self.response[0]
    }
}

pub enum DataBuffer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

pub struct HostData<'a> {
    pub block_size: u32,
    pub block_count: u32,
    pub buffer: DataBuffer<'a>,
    /// Host sends STOP_TRANSMISSION on its own after the last block.
    pub enable_auto_command12: bool,
    /// Bus test mode, line errors must not fail the transfer.
    pub enable_ignore_error: bool,
}

impl<'a> HostData<'a> {
    pub fn read(block_size: u32, block_count: u32, buffer: &'a mut [u8]) -> Self {
        Self {
            block_size,
            block_count,
            buffer: DataBuffer::Read(buffer),
            enable_auto_command12: false,
            enable_ignore_error: false,
        }
    }

    pub fn write(block_size: u32, block_count: u32, buffer: &'a [u8]) -> Self {
        Self {
            block_size,
            block_count,
            buffer: DataBuffer::Write(buffer),
            enable_auto_command12: false,
            enable_ignore_error: false,
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self.buffer, DataBuffer::Read(_))
    }
}

/// One command and its optional data phase.
pub struct HostTransfer<'a> {
    pub cmd: HostCmd,
    pub data: Option<HostData<'a>>,
}

impl<'a> HostTransfer<'a> {
    pub fn new(cmd: HostCmd) -> Self {
        Self { cmd, data: None }
    }

    pub fn with_data(cmd: HostCmd, data: HostData<'a>) -> Self {
        Self {
            cmd,
            data: Some(data),
        }
    }
}
