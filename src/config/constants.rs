// src/config/constants.rs
//! System-wide constants for the GSV measuring-value and digital filter core

/// Measuring-value frame and object mapping constants
pub mod protocol {
    /// Maximum number of value objects in one measuring-value frame
    pub const VALOBJ_NUM_MAX: usize = 16;
    /// Number of analogue input channels of a GSV-8
    pub const IN_CHAN_NO: u8 = 8;
    /// Number of channels feeding a six-axis (force/torque) sensor
    pub const SIX_AXIS_CHAN_NUM: u8 = 6;

    pub const DATATYP_INT16: u32 = 1;
    pub const DATATYP_INT24: u32 = 2;
    pub const DATATYP_FLOAT: u32 = 3;

    pub const VALTYPE_NORMAL: u8 = 0;
    pub const VALTYPE_MAXVAL: u8 = 1;
    pub const VALTYPE_MINVAL: u8 = 2;

    pub const VAL_PHYS_TYPE_NOTDEF: u8 = 0x00;
    pub const VAL_PHYS_TYPE_FORCE_X: u8 = 0x01;
    pub const VAL_PHYS_TYPE_FORCE_Y: u8 = 0x02;
    pub const VAL_PHYS_TYPE_FORCE_Z: u8 = 0x03;
    pub const VAL_PHYS_TYPE_TORQUE_X: u8 = 0x04;
    pub const VAL_PHYS_TYPE_TORQUE_Y: u8 = 0x05;
    pub const VAL_PHYS_TYPE_TORQUE_Z: u8 = 0x06;
    pub const VAL_PHYS_TYPE_RAW: u8 = 0x10;
    pub const VAL_PHYS_TYPE_TEMP: u8 = 0x20;

    // Bit positions inside a packed object mapping word
    pub const MAPPING_CHANNEL_SHIFT: u32 = 0;
    pub const MAPPING_VALTYPE_SHIFT: u32 = 8;
    pub const MAPPING_PHYSTYPE_SHIFT: u32 = 16;
    pub const MAPPING_FIELD_MASK: u32 = 0xFF;

    // Mode flags as returned by the device
    pub const SIX_AXIS_SENSOR_ACTIVE: u32 = 0x01;
    pub const SIX_AXIS_SENSOR_ACT_GSV6: u32 = 0x400;

    // Transmission flags
    pub const TX_MAXVALUE: u32 = 0x04;
    pub const TX_MINVALUE: u32 = 0x08;

    // Per-value error type enumeration sent by the device
    pub const VALERR_NONE: u32 = 0;
    pub const VALERR_TYPE_SATURATED: u32 = 1;
    pub const VALERR_TYPE_MAX_EXCEED: u32 = 2;
    pub const VALERR_TYPE_SENSOR_BROKEN: u32 = 3;
    pub const ERR_TYPE_ANALOG_OUTPUT: u32 = 4;
    pub const ERR_TYPE_DIGITAL_OUTPUT: u32 = 5;
}

/// Buffer sizing constants
pub mod buffers {
    /// Default number of measuring values kept per value object
    pub const DEFAULT_BUFFER_CAPACITY: usize = 48_000;
    pub const MIN_BUFFER_CAPACITY: usize = 1;
    pub const MAX_BUFFER_CAPACITY: usize = 10_000_000;
}

/// Reception thread constants
pub mod receiver {
    pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 50;
    pub const MIN_POLL_TIMEOUT_MS: u64 = 1;
    pub const MAX_POLL_TIMEOUT_MS: u64 = 10_000;
    pub const THREAD_NAME: &str = "gsv-receiver";
}

/// Digital filter constants
pub mod filters {
    pub const FILT_TYPE_IIR: u8 = 0x00;
    pub const FILT_TYPE_FIR: u8 = 0x80;
    pub const FILT_TYPE_IIR_LP: u8 = 0x04;
    pub const FILT_TYPE_IIR_HP: u8 = 0x14;
    pub const FILT_TYPE_IIR_BP: u8 = 0x24;
    pub const FILT_TYPE_IIR_BS: u8 = 0x34;
    pub const FILT_TYPE_UNCONFIG: u8 = 0x00;
    pub const FILT_ORDER_MSK: u8 = 0x0F;
    pub const FILT_CHARACT_MSK: u8 = 0x70;
    pub const FILT_CHARACT_LP: u8 = 0x00;
    pub const FILT_CHARACT_HP: u8 = 0x10;
    pub const FILT_CHARACT_BP: u8 = 0x20;
    pub const FILT_CHARACT_BS: u8 = 0x30;

    pub const FILT_ORDER_IIR: usize = 4;
    pub const FILT_MINORDER_FIR: usize = 4;
    pub const FILT_MAXORDER_FIR: usize = 14;
    pub const IIR_FEED_FORWARD_LEN: usize = 5;
    pub const IIR_FEEDBACK_LEN: usize = 4;

    /// Maximum ratio Fcutoff / Fsample (Nyquist)
    pub const FILT_FCUT_RATIO_MAX: f64 = 0.5;

    /// Highest channel number a filter can be committed to
    pub const MAX_FILTER_CHANNEL: u8 = 8;

    // Numeric safety thresholds
    pub const MAX_ROOT_ITERATIONS: usize = 500;
    pub const ROOT_TOLERANCE: f64 = 1e-13;
    pub const STABILITY_MARGIN: f64 = 1e-9;
    pub const IIR_COEFF_SUM_MAX: f64 = 16.0;
    pub const FIR_COEFF_SUM_MAX: f64 = 4.0;
    pub const INTERN_GAIN_MAX: f64 = 1.0e8;
    pub const GAIN_SCAN_POINTS: usize = 1024;

    // Hamming window
    pub const HAMMING_WINDOW_ALPHA: f64 = 0.54;
    pub const HAMMING_WINDOW_BETA: f64 = 0.46;
}

/// Filter simulation and export constants
pub mod simulation {
    pub const SIMUL_DFILT_FREQ_RESPONSE: u32 = 1;
    pub const SIMUL_DFILT_STEP_RESPONSE: u32 = 2;
    pub const DEFAULT_STEP_START: f64 = 0.0;
    pub const DEFAULT_STEP_END: f64 = 1.0;
    pub const MAX_SIMULATION_POINTS: usize = 1_000_000;
    pub const DEFAULT_EXPORT_DELIMITER: char = ';';
}

/// Configuration file locations
pub mod paths {
    pub const DEFAULT_CONFIG_FILE: &str = "gsv.toml";
    pub const USER_CONFIG_DIR: &str = ".config/gsv-core";
    pub const SYSTEM_CONFIG_FILE: &str = "/etc/gsv-core/gsv.toml";
    pub const ENV_PREFIX: &str = "GSV_";
}

/// Error code table (see the device manual and DLL error code listing)
pub mod error_codes {
    pub const ERR_OK: u32 = 0x00;

    /// Device errors are reported as `ERR_MSK_DEVICE | code`
    pub const ERR_MSK_DEVICE: u32 = 0x3800_0000;
    pub const ERR_MASK_ALL: u32 = 0xFC00_0000;
    pub const DEVICE_CODE_MASK: u32 = 0xFF;

    pub const ERR_CMD_NOTKNOWN: u8 = 0x40;
    pub const ERR_CMD_NOTIMPL: u8 = 0x41;
    pub const ERR_FRAME_ERROR: u8 = 0x42;
    pub const ERR_PAR: u8 = 0x50;
    pub const ERR_PAR_ADR: u8 = 0x51;
    pub const ERR_PAR_DAT: u8 = 0x52;
    pub const ERR_PAR_BITS: u8 = 0x53;
    pub const ERR_PAR_ABSBIG: u8 = 0x54;
    pub const ERR_PAR_ABSMALL: u8 = 0x55;
    pub const ERR_PAR_COMBI: u8 = 0x56;
    pub const ERR_PAR_RELBIG: u8 = 0x57;
    pub const ERR_PAR_RELSMALL: u8 = 0x58;
    pub const ERR_PAR_NOTIMPL: u8 = 0x59;
    pub const ERR_WRONG_PAR_NUM: u8 = 0x5B;
    pub const ERR_PAR_NOFIT_SETTINGS: u8 = 0x5C;
    pub const ERR_PAR_HW_COLLISION: u8 = 0x5D;
    pub const ERR_NO_DATA_AVAIL: u8 = 0x60;
    pub const ERR_DATA_INCONSISTENT: u8 = 0x61;
    pub const ERR_WRONG_MOD_STATE: u8 = 0x62;
    pub const ERR_NOT_SUPPORTED_D: u8 = 0x63;
    pub const ERR_FDATA_TOO_HIGH: u8 = 0x64;
    pub const ERR_MEMORY_WRONG_COND: u8 = 0x6E;
    pub const ERR_MEMORY_ACCESS_DENIED: u8 = 0x6F;
    pub const ERR_ACC_DEN: u8 = 0x70;
    pub const ERR_ACC_BLK: u8 = 0x71;
    pub const ERR_ACC_PWD: u8 = 0x72;
    pub const ERR_ACC_MAXWR: u8 = 0x74;
    pub const ERR_ACC_PORT: u8 = 0x75;
    pub const ERR_INTERNAL: u8 = 0x80;
    pub const ERR_ARITH: u8 = 0x81;
    pub const ERR_INTER_ADC: u8 = 0x82;
    pub const ERR_MWERT_ERR: u8 = 0x83;
    pub const ERR_EEPROM: u8 = 0x84;
    pub const ERR_RET_TXBUF: u8 = 0x91;
    pub const ERR_RET_BUSY: u8 = 0x92;
    pub const ERR_RET_RXBUF: u8 = 0x99;

    // Host library errors
    pub const ERR_COM_GEN_FAILURE: u32 = 0x3000_001F;
    pub const ERR_NO_GSV_ANSWER: u32 = 0x3000_0058;
    pub const ERR_WRONG_ANSWER_NUM: u32 = 0x3000_0059;
    pub const ERR_WRONG_ANSWER: u32 = 0x3000_0060;
    pub const ERR_WRONG_FRAME_SUFFIX: u32 = 0x3000_0061;
    pub const ERR_NOT_SUPPORTED: u32 = 0x3000_0062;
    pub const ERR_PARAM_NOT_STORED: u32 = 0x3000_0065;
    pub const ERR_MUTEXFAILED: u32 = 0x3000_00F0;
    pub const ERR_EVENTFAILED: u32 = 0x3000_00F1;
    pub const ERR_MEM_ALLOC: u32 = 0x3000_00F3;
    pub const ERR_NO_GSV_FOUND: u32 = 0x3000_00F4;
    pub const ERR_BYTES_WRITTEN: u32 = 0x3000_00F5;
    pub const ERR_COM_ALREADY_OPEN: u32 = 0x3000_00F6;
    pub const ERR_WRONG_PARAMETER: u32 = 0x3000_0100;
    pub const ERR_WRONG_COMNO: u32 = 0x3000_0101;
    pub const ERR_INTERNAL_FUNC: u32 = 0x3000_0105;
    pub const ERR_FILE_CONTENT: u32 = 0x3000_0108;
    pub const ERR_UNKNOWN_VALUE: u32 = 0x3000_010A;

    // Digital filter errors
    pub const DF_ERR_NOT_INIT: u32 = 0x3000_0201;
    pub const DF_ERR_OPT_WRONG: u32 = 0x3000_0202;
    pub const DF_ERR_NO_CONVERGENCE: u32 = 0x3000_0203;
    pub const DF_ERR_COEFF_SUM_TOOBIG: u32 = 0x3000_0208;
    pub const DF_ERR_INTERN_GAIN_TOO_BIG: u32 = 0x3000_0209;
    pub const DF_ERR_FIR_ODD_ORDER_NOTALLOWED: u32 = 0x3000_020A;

    /// Library-side code for a parameter combination the device would reject
    /// with `ERR_PAR_COMBI`
    pub const ERR_PAR_COMBI_HOST: u32 = ERR_MSK_DEVICE | ERR_PAR_COMBI as u32;
    /// Library-side code for a measuring-value frame of unexpected length
    pub const ERR_FRAME_SIZE_HOST: u32 = ERR_WRONG_ANSWER_NUM;
    /// Library-side code for an object mapping that contradicts itself
    pub const ERR_CONFIG_INCONSISTENT_HOST: u32 = ERR_MSK_DEVICE | ERR_DATA_INCONSISTENT as u32;
    /// Library-side code for a ring buffer overrun
    pub const ERR_BUFFER_OVERRUN_HOST: u32 = ERR_MSK_DEVICE | ERR_RET_RXBUF as u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_type_bytes_are_consistent() {
        assert_eq!(filters::FILT_TYPE_IIR_LP, filters::FILT_CHARACT_LP | filters::FILT_ORDER_IIR as u8);
        assert_eq!(filters::FILT_TYPE_IIR_HP, filters::FILT_CHARACT_HP | filters::FILT_ORDER_IIR as u8);
        assert_eq!(filters::FILT_TYPE_IIR_BP, filters::FILT_CHARACT_BP | filters::FILT_ORDER_IIR as u8);
        assert_eq!(filters::FILT_TYPE_IIR_BS, filters::FILT_CHARACT_BS | filters::FILT_ORDER_IIR as u8);
        assert!(filters::FILT_MAXORDER_FIR as u8 <= filters::FILT_ORDER_MSK);
    }

    #[test]
    fn test_device_error_mask() {
        assert_eq!(error_codes::ERR_CONFIG_INCONSISTENT_HOST & error_codes::ERR_MASK_ALL, error_codes::ERR_MSK_DEVICE);
        assert_eq!(error_codes::ERR_PAR_COMBI_HOST & error_codes::DEVICE_CODE_MASK, 0x56);
    }

    #[test]
    fn test_buffer_limits() {
        assert!(buffers::MIN_BUFFER_CAPACITY <= buffers::DEFAULT_BUFFER_CAPACITY);
        assert!(buffers::DEFAULT_BUFFER_CAPACITY <= buffers::MAX_BUFFER_CAPACITY);
    }
}
