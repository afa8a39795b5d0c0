// src/error.rs
//! Unified error handling for the GSV core
//!
//! Every failure raised by the decoder, the buffers, the filter designer or the
//! simulator is a [`GsvError`]. Its [`ErrorKind`] resolves to one entry of the
//! device/DLL error code table, so a caller-facing "last error" facility can
//! report the numeric code and the vendor text verbatim.

use crate::config::constants::error_codes::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Error taxonomy shared by all components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Object mapping or data type reported by the device is not usable
    ConfigInconsistent,
    /// Measuring-value frame length does not match the object map
    FrameSizeMismatch,
    /// Ring buffer overwrote unread values (advisory)
    BufferOverrun,
    /// Filter or simulation options out of range
    OptionsInvalid,
    /// Parameters are individually valid but do not fit together
    ParameterCombinationInvalid,
    /// Filter calculation did not converge to a stable design
    NoConvergence,
    /// Coefficient magnitude sum exceeds the precision ceiling
    CoeffSumTooBig,
    /// Internal recursion gain exceeds the precision ceiling
    InternGainTooBig,
    /// No filter has been designed yet
    NotInitialized,
    /// Function argument outside its allowed range
    WrongParameter,
    /// Value read from the device cannot be decoded
    UnknownValue,
    /// Transport collaborator failed
    Transport,
    /// File or stream I/O failed
    Io,
    /// Error code reported by the device itself (bits 7:0)
    ///
    /// Codes 0x56, 0x61 and 0x99 share their numeric value with a host kind and
    /// classify as that kind in [`from_code`](Self::from_code).
    Device(u8),
    /// Any other code not covered above
    Other(u32),
}

impl ErrorKind {
    /// Numeric code as listed in the error code table
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::ConfigInconsistent => ERR_CONFIG_INCONSISTENT_HOST,
            ErrorKind::FrameSizeMismatch => ERR_FRAME_SIZE_HOST,
            ErrorKind::BufferOverrun => ERR_BUFFER_OVERRUN_HOST,
            ErrorKind::OptionsInvalid => DF_ERR_OPT_WRONG,
            ErrorKind::ParameterCombinationInvalid => ERR_PAR_COMBI_HOST,
            ErrorKind::NoConvergence => DF_ERR_NO_CONVERGENCE,
            ErrorKind::CoeffSumTooBig => DF_ERR_COEFF_SUM_TOOBIG,
            ErrorKind::InternGainTooBig => DF_ERR_INTERN_GAIN_TOO_BIG,
            ErrorKind::NotInitialized => DF_ERR_NOT_INIT,
            ErrorKind::WrongParameter => ERR_WRONG_PARAMETER,
            ErrorKind::UnknownValue => ERR_UNKNOWN_VALUE,
            ErrorKind::Transport => ERR_COM_GEN_FAILURE,
            ErrorKind::Io => ERR_INTERNAL_FUNC,
            ErrorKind::Device(code) => ERR_MSK_DEVICE | code as u32,
            ErrorKind::Other(code) => code,
        }
    }

    /// Classify a raw error integer
    ///
    /// Host kinds that reuse a device code take precedence over `Device(..)`, so
    /// `from_code(c).code() == c` holds for every code while
    /// `from_code(Device(0x56).code())` yields `ParameterCombinationInvalid`.
    pub fn from_code(code: u32) -> Self {
        match code {
            ERR_CONFIG_INCONSISTENT_HOST => ErrorKind::ConfigInconsistent,
            ERR_FRAME_SIZE_HOST => ErrorKind::FrameSizeMismatch,
            ERR_BUFFER_OVERRUN_HOST => ErrorKind::BufferOverrun,
            DF_ERR_OPT_WRONG | DF_ERR_FIR_ODD_ORDER_NOTALLOWED => ErrorKind::OptionsInvalid,
            ERR_PAR_COMBI_HOST => ErrorKind::ParameterCombinationInvalid,
            DF_ERR_NO_CONVERGENCE => ErrorKind::NoConvergence,
            DF_ERR_COEFF_SUM_TOOBIG => ErrorKind::CoeffSumTooBig,
            DF_ERR_INTERN_GAIN_TOO_BIG => ErrorKind::InternGainTooBig,
            DF_ERR_NOT_INIT => ErrorKind::NotInitialized,
            ERR_WRONG_PARAMETER => ErrorKind::WrongParameter,
            ERR_UNKNOWN_VALUE => ErrorKind::UnknownValue,
            ERR_COM_GEN_FAILURE => ErrorKind::Transport,
            ERR_INTERNAL_FUNC => ErrorKind::Io,
            c if c & ERR_MASK_ALL == ERR_MSK_DEVICE => ErrorKind::Device((c & DEVICE_CODE_MASK) as u8),
            c => ErrorKind::Other(c),
        }
    }

    /// Vendor error text for this kind
    pub fn text(self) -> &'static str {
        error_text(self.code())
    }

    /// Whether the condition leaves the operation's result usable
    pub fn is_advisory(self) -> bool {
        matches!(self, ErrorKind::BufferOverrun)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Device(code) => write!(f, "Device(0x{:02X})", code),
            ErrorKind::Other(code) => write!(f, "Other(0x{:08X})", code),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Look up the vendor text for an error code
pub fn error_text(code: u32) -> &'static str {
    if code == ERR_OK {
        return "No error";
    }
    if code & ERR_MASK_ALL == ERR_MSK_DEVICE {
        return device_error_text((code & DEVICE_CODE_MASK) as u8);
    }
    match code {
        ERR_MUTEXFAILED => "MEGSV86xx.DLL: Mutex request refused by OS",
        ERR_EVENTFAILED => "MEGSV86xx.DLL: Event request refused by OS",
        ERR_MEM_ALLOC => "MEGSV86xx.DLL: Memory allocation request refused by OS",
        ERR_NO_GSV_FOUND => "MEGSV86xx.DLL: Com port could be opened, but no GSV answered",
        ERR_BYTES_WRITTEN => "MEGSV86xx.DLL: Could not write enough bytes to the port",
        ERR_WRONG_PARAMETER => "MEGSV86xx.DLL: Function parameter exceedance",
        ERR_NO_GSV_ANSWER => "MEGSV86xx.DLL: Command response from device timed out",
        ERR_WRONG_ANSWER_NUM => "MEGSV86xx.DLL: Parameter number in command answer frame not as expected",
        ERR_WRONG_ANSWER => "MEGSV86xx.DLL: GSV-8 sended wrong command answer",
        ERR_WRONG_FRAME_SUFFIX => "MEGSV86xx.DLL: Frame suffix from device wrong",
        ERR_NOT_SUPPORTED => "MEGSV86xx.DLL: Device firmware doesn't support the request",
        ERR_WRONG_COMNO => "MEGSV86xx.DLL: ComNo parameter wrong",
        ERR_COM_ALREADY_OPEN => "MEGSV86xx.DLL: Comport requested for opening is already open",
        ERR_COM_GEN_FAILURE => "MEGSV86xx.DLL: Hardware-or driver-error of COMport (Generic error: System Error 0x1F)",
        ERR_INTERNAL_FUNC => "MEGSV86xx.DLL: Internal function call failed",
        ERR_PARAM_NOT_STORED => "MEGSV86xx.DLL: Parameter is not stored (correctly) in the device memory",
        ERR_FILE_CONTENT => "MEGSV86xx.DLL: File passed by user has error in its content",
        ERR_UNKNOWN_VALUE => "MEGSV86xx.DLL: Value read from device can not be deocded",
        DF_ERR_NOT_INIT => "DLL.Dfilter: Digital filter function could not be executed, because digital filter not initialized",
        DF_ERR_OPT_WRONG => "DLL.Dfilter: Wrong or incompatible filter options",
        DF_ERR_NO_CONVERGENCE => "DLL.Dfilter: Digital filter calculation failed to converge",
        DF_ERR_COEFF_SUM_TOOBIG => "DLL.Dfilter: Resulting coefficients discarded, because they may limit measuring precision (sum too big)",
        DF_ERR_INTERN_GAIN_TOO_BIG => "DLL.Dfilter: Resulting coefficients discarded, because they may limit measuring precision (gain too big)",
        DF_ERR_FIR_ODD_ORDER_NOTALLOWED => "DLL.Dfilter: Odd filter order not allowed with this release",
        _ => "Unknown error code",
    }
}

fn device_error_text(code: u8) -> &'static str {
    match code {
        0x01 => "Device: No error, but further device parameters changed",
        ERR_CMD_NOTKNOWN => "Device: Command number unknown",
        ERR_CMD_NOTIMPL => "Device: Command not implemented",
        ERR_FRAME_ERROR => "Device: Frame error: wrong suffix",
        ERR_PAR => "Device: Parameter wrong",
        ERR_PAR_ADR => "Device: Wrong index or adress parameter",
        ERR_PAR_DAT => "Device: Wrong data parameter",
        ERR_PAR_BITS => "Device: Wrong bits inside parameter",
        ERR_PAR_ABSBIG => "Device: Parameter abolutely too big",
        ERR_PAR_ABSMALL => "Device: Parameter abolutely too small",
        ERR_PAR_COMBI => "Device: Wrong parameter / setting combination",
        ERR_PAR_RELBIG => "Device: Parameter too big in relation to other parameters / Settings",
        ERR_PAR_RELSMALL => "Device: Parameter too small in relation to other parameters / Settings",
        ERR_PAR_NOTIMPL => "Device: Function invoked by parameter is not implemented",
        ERR_WRONG_PAR_NUM => "Device: Wrong number of parameters in frame",
        ERR_PAR_NOFIT_SETTINGS => "Device: Parameter improper with respect to device's settings",
        ERR_PAR_HW_COLLISION => "Device: Function leads to hardware (connection) collision, e.g. short-circuit",
        ERR_NO_DATA_AVAIL => "Device: Data reqested not available (e.g. not initiated)",
        ERR_DATA_INCONSISTENT => "Device: Data stored not consistent in itself or with parameters",
        ERR_WRONG_MOD_STATE => "Device: Command could not be executed, because device or functionality in improper state",
        ERR_NOT_SUPPORTED_D => "Device: Denied, because requested funcionality not supported",
        ERR_FDATA_TOO_HIGH => "Device: Denied, because data rate too high for requested setting",
        ERR_MEMORY_WRONG_COND => "Device: Memory write denied, because condition(s) not satisfied",
        ERR_MEMORY_ACCESS_DENIED => "Device: Memory write: Access denied",
        ERR_ACC_DEN => "Device: Access denied",
        ERR_ACC_BLK => "Device: Access denied, because write functions are blocked",
        ERR_ACC_PWD => "Device: Access denied: Missing password/PIN",
        ERR_ACC_MAXWR => "Device: Access denied: Maximum executions reched",
        ERR_ACC_PORT => "Device: Access from this port denied (other port seems to have write access)",
        ERR_INTERNAL => "Internal exception in device. Please contact manufacturer",
        ERR_ARITH => "Internal arithmetic exception in device. Please contact manufacturer",
        ERR_INTER_ADC => "Device: Erratic behaviour of AD converter. Please contact manufacturer",
        ERR_MWERT_ERR => "Device: Actual measuring value inappropriate to fulfil request",
        ERR_EEPROM => "Device: Erratic behaviour of EEPROM memory. Please contact manufacturer",
        ERR_RET_TXBUF => "Device transmission buffer full",
        ERR_RET_BUSY => "Device too busy to execute request",
        ERR_RET_RXBUF => "Device receive buffer full",
        _ => "Device: Unknown error code",
    }
}

/// Where an error was raised
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}::{} at {}:{}", self.component, self.operation, file, line),
            _ => write!(f, "{}::{}", self.component, self.operation),
        }
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

/// Error raised by any core component
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{kind}] {message} ({context})")]
pub struct GsvError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: ErrorContext,
}

impl GsvError {
    pub fn new(kind: ErrorKind, context: ErrorContext, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Numeric error code
    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    /// Vendor error text
    pub fn text(&self) -> &'static str {
        self.kind.text()
    }
}

impl From<std::io::Error> for GsvError {
    fn from(err: std::io::Error) -> Self {
        GsvError::new(ErrorKind::Io, ErrorContext::new("io", "stream"), err.to_string())
    }
}

/// Result type alias for GSV operations
pub type GsvResult<T> = Result<T, GsvError>;

/// Slot holding the most recent failure of a session
#[derive(Debug, Default)]
pub struct LastError {
    slot: Mutex<Option<GsvError>>,
}

impl LastError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, err: &GsvError) {
        *self.slot.lock() = Some(err.clone());
    }

    /// Code of the last failure, `ERR_OK` if none was recorded
    pub fn code(&self) -> u32 {
        self.slot.lock().as_ref().map_or(ERR_OK, GsvError::code)
    }

    /// Vendor text of the last failure
    pub fn text(&self) -> &'static str {
        error_text(self.code())
    }

    pub fn get(&self) -> Option<GsvError> {
        self.slot.lock().clone()
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}

/// Record the error of a result into a [`LastError`] slot on the way out
pub trait RecordLastError<T> {
    fn record_into(self, slot: &LastError) -> GsvResult<T>;
}

impl<T> RecordLastError<T> for GsvResult<T> {
    fn record_into(self, slot: &LastError) -> GsvResult<T> {
        if let Err(ref err) = self {
            slot.record(err);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("decoder", "decode_frame");
        assert_eq!(context.component, "decoder");
        assert_eq!(context.operation, "decode_frame");
        assert!(context.timestamp <= SystemTime::now());
    }

    #[test]
    fn test_error_context_macro_sets_location() {
        let context = error_context!("designer", "design");
        assert!(context.file.is_some());
        assert!(context.line.is_some());
    }

    #[test]
    fn test_kind_code_round_trip() {
        let kinds = [
            ErrorKind::ConfigInconsistent,
            ErrorKind::FrameSizeMismatch,
            ErrorKind::BufferOverrun,
            ErrorKind::OptionsInvalid,
            ErrorKind::ParameterCombinationInvalid,
            ErrorKind::NoConvergence,
            ErrorKind::CoeffSumTooBig,
            ErrorKind::InternGainTooBig,
            ErrorKind::NotInitialized,
            ErrorKind::WrongParameter,
            ErrorKind::UnknownValue,
            ErrorKind::Transport,
            ErrorKind::Io,
            ErrorKind::Device(ERR_ACC_PWD),
        ];
        for kind in kinds {
            assert_eq!(ErrorKind::from_code(kind.code()), kind, "round trip of {}", kind);
        }
    }

    #[test]
    fn test_shared_device_codes_classify_as_host_kinds() {
        let shared = [
            (ERR_PAR_COMBI, ErrorKind::ParameterCombinationInvalid),
            (ERR_DATA_INCONSISTENT, ErrorKind::ConfigInconsistent),
            (ERR_RET_RXBUF, ErrorKind::BufferOverrun),
        ];
        for (device_code, host_kind) in shared {
            let code = ErrorKind::Device(device_code).code();
            assert_eq!(ErrorKind::from_code(code), host_kind);
            assert_eq!(ErrorKind::from_code(code).code(), code);
            assert_eq!(host_kind.text(), ErrorKind::Device(device_code).text());
        }
    }

    #[test]
    fn test_filter_error_texts() {
        assert_eq!(
            ErrorKind::NoConvergence.text(),
            "DLL.Dfilter: Digital filter calculation failed to converge"
        );
        assert_eq!(ErrorKind::NotInitialized.code(), 0x3000_0201);
        assert_eq!(ErrorKind::CoeffSumTooBig.code(), 0x3000_0208);
        assert_eq!(ErrorKind::InternGainTooBig.code(), 0x3000_0209);
    }

    #[test]
    fn test_device_code_classification() {
        let kind = ErrorKind::from_code(0x3800_0072);
        assert_eq!(kind, ErrorKind::Device(0x72));
        assert_eq!(kind.text(), "Device: Access denied: Missing password/PIN");
        assert_eq!(ErrorKind::from_code(0x1234), ErrorKind::Other(0x1234));
        assert_eq!(error_text(0x1234), "Unknown error code");
    }

    #[test]
    fn test_error_display() {
        let err = GsvError::new(
            ErrorKind::FrameSizeMismatch,
            ErrorContext::new("decoder", "decode_frame"),
            "expected 16 bytes, got 15",
        );
        let display = format!("{}", err);
        assert!(display.contains("FrameSizeMismatch"));
        assert!(display.contains("16"));
        assert!(display.contains("decoder::decode_frame"));
    }

    #[test]
    fn test_last_error_slot() {
        let slot = LastError::new();
        assert_eq!(slot.code(), ERR_OK);
        assert_eq!(slot.text(), "No error");

        let result: GsvResult<()> = Err(GsvError::new(
            ErrorKind::NotInitialized,
            ErrorContext::new("simulator", "simulate"),
            "no design",
        ));
        assert!(result.record_into(&slot).is_err());
        assert_eq!(slot.code(), DF_ERR_NOT_INIT);
        assert!(slot.text().starts_with("DLL.Dfilter"));

        slot.clear();
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GsvError>();
        assert_send_sync::<LastError>();
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: GsvError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.message.contains("missing"));
    }
}
