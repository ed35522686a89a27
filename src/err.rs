use core::fmt::Display;

/// Failure reported by the host controller underneath the card layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    CommandError,
    DataError,
    Timeout,
    Unsupported,
    NotReady,
}

impl Display for HostError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HostError::CommandError => write!(f, "Command execution error"),
            HostError::DataError => write!(f, "Data transfer error"),
            HostError::Timeout => write!(f, "Host operation timed out"),
            HostError::Unsupported => write!(f, "Unsupported by host"),
            HostError::NotReady => write!(f, "Host not ready"),
        }
    }
}

pub type HostStatus<T = ()> = Result<T, HostError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdmmcError {
    NotSupportYet,
    TransferFailed,
    SetCardBlockSizeFailed,
    HostNotSupport,
    CardNotSupport,
    AllSendCidFailed,
    SendRelativeAddressFailed,
    SendCsdFailed,
    SelectCardFailed,
    SendScrFailed,
    SetDataBusWidthFailed,
    GoIdleFailed,
    HandShakeOperationConditionFailed,
    SendApplicationCommandFailed,
    SwitchFailed,
    StopTransmissionFailed,
    WaitWriteCompleteFailed,
    SetBlockCountFailed,
    SetRelativeAddressFailed,
    SwitchHighSpeedFailed,
    SendExtendedCsdFailed,
    ConfigureBootFailed,
    ConfigureExtendedCsdFailed,
    EnableHighCapacityEraseFailed,
    SendTestPatternFailed,
    ReceiveTestPatternFailed,
    Timeout,
    InvalidArgument,
    Fail,
}

impl Display for SdmmcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SdmmcError::NotSupportYet => write!(f, "Not supported yet"),
            SdmmcError::TransferFailed => write!(f, "Transfer failed"),
            SdmmcError::SetCardBlockSizeFailed => write!(f, "Set card block size failed"),
            SdmmcError::HostNotSupport => write!(f, "Host does not support the card"),
            SdmmcError::CardNotSupport => write!(f, "Card does not support the feature"),
            SdmmcError::AllSendCidFailed => write!(f, "ALL_SEND_CID failed"),
            SdmmcError::SendRelativeAddressFailed => write!(f, "SEND_RELATIVE_ADDR failed"),
            SdmmcError::SendCsdFailed => write!(f, "SEND_CSD failed"),
            SdmmcError::SelectCardFailed => write!(f, "SELECT_CARD failed"),
            SdmmcError::SendScrFailed => write!(f, "SEND_SCR failed"),
            SdmmcError::SetDataBusWidthFailed => write!(f, "Set data bus width failed"),
            SdmmcError::GoIdleFailed => write!(f, "GO_IDLE_STATE failed"),
            SdmmcError::HandShakeOperationConditionFailed => {
                write!(f, "Operation condition handshake failed")
            }
            SdmmcError::SendApplicationCommandFailed => write!(f, "APP_CMD failed"),
            SdmmcError::SwitchFailed => write!(f, "SWITCH failed"),
            SdmmcError::StopTransmissionFailed => write!(f, "STOP_TRANSMISSION failed"),
            SdmmcError::WaitWriteCompleteFailed => write!(f, "Wait write complete failed"),
            SdmmcError::SetBlockCountFailed => write!(f, "SET_BLOCK_COUNT failed"),
            SdmmcError::SetRelativeAddressFailed => write!(f, "SET_RELATIVE_ADDR failed"),
            SdmmcError::SwitchHighSpeedFailed => write!(f, "Switch to high speed failed"),
            SdmmcError::SendExtendedCsdFailed => write!(f, "SEND_EXT_CSD failed"),
            SdmmcError::ConfigureBootFailed => write!(f, "Configure boot failed"),
            SdmmcError::ConfigureExtendedCsdFailed => write!(f, "Configure EXT_CSD failed"),
            SdmmcError::EnableHighCapacityEraseFailed => {
                write!(f, "Enable high capacity erase failed")
            }
            SdmmcError::SendTestPatternFailed => write!(f, "BUS_TEST_W failed"),
            SdmmcError::ReceiveTestPatternFailed => write!(f, "BUS_TEST_R failed"),
            SdmmcError::Timeout => write!(f, "Operation timed out"),
            SdmmcError::InvalidArgument => write!(f, "Invalid argument"),
            SdmmcError::Fail => write!(f, "Operation failed"),
        }
    }
}

pub type SdmmcResult<T = ()> = Result<T, SdmmcError>;
