//! STGAP1BS/STGAP1AS command and register tables
//!
//! Static reference data from the STGAP1BS datasheet
//! (<https://www.st.com/resource/en/datasheet/stgap1bs.pdf>). Field groups are
//! listed in the order they are rendered, most significant bits first.

/// Mask selecting the register operation bits of an opcode
pub const CMD_REG_MASK: u8 = 0b1110_0000;
/// Opcode pattern for a register write
pub const CMD_WRITE_REG: u8 = 0b1000_0000;
/// Opcode pattern for a register read
pub const CMD_READ_REG: u8 = 0b1010_0000;
/// Mask selecting the register address of a read/write opcode
pub const REG_ADDR_MASK: u8 = 0x1F;

/// A named bit or bit-range within a register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    /// Single on/off bit(s): `name` is emitted when every masked bit is set
    Flag { mask: u8, name: &'static str },
    /// Multi-valued field: `byte & mask` is looked up in `values`
    Enum {
        mask: u8,
        values: &'static [(u8, &'static str)],
    },
}

impl FieldGroup {
    /// Bits covered by this group
    pub const fn mask(&self) -> u8 {
        match self {
            FieldGroup::Flag { mask, .. } | FieldGroup::Enum { mask, .. } => *mask,
        }
    }
}

/// Register address, display name and field layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDefinition {
    pub address: u8,
    pub name: &'static str,
    pub fields: &'static [FieldGroup],
}

/// Fixed-opcode commands
pub const COMMANDS: &[(u8, &str)] = &[
    (0b0010_1010, "START_CONFIG"),
    (0b0011_1010, "STOP_CONFIG"),
    (0b0000_0000, "NOP"),
    (0b1101_0000, "RESET_STATUS"),
    (0b1110_1010, "GLOBAL_RESET"),
    (0b1111_0101, "SLEEP"),
];

const fn flag(mask: u8, name: &'static str) -> FieldGroup {
    FieldGroup::Flag { mask, name }
}

const fn group(mask: u8, values: &'static [(u8, &'static str)]) -> FieldGroup {
    FieldGroup::Enum { mask, values }
}

const CFG1: &[FieldGroup] = &[
    flag(0b1000_0000, "CRC_SPI"),
    flag(0b0100_0000, "UVLOD_EN"),
    flag(0b0010_0000, "SD_FLAG"),
    flag(0b0001_0000, "DIAG_EN"),
    // Deadtime
    group(
        0b0000_1100,
        &[
            (0b0000_0000, "DT_DISABLED"),
            (0b0000_0100, "DT_250NS"),
            (0b0000_1000, "DT_800NS"),
            (0b0000_1100, "DT_1200NS"),
        ],
    ),
    // Input deglitch filter
    group(
        0b0000_0011,
        &[
            (0b0000_0000, "IN_FILTER_DISABLED"),
            (0b0000_0001, "IN_FILTER_160NS"),
            (0b0000_0010, "IN_FILTER_500NS"),
            (0b0000_0011, "IN_FILTER_70NS"),
        ],
    ),
];

const CFG2: &[FieldGroup] = &[
    // Sense comparator threshold
    group(
        0b1110_0000,
        &[
            (0b0000_0000, "SENSE_100MV"),
            (0b0010_0000, "SENSE_125MV"),
            (0b0100_0000, "SENSE_150MV"),
            (0b0110_0000, "SENSE_175MV"),
            (0b1000_0000, "SENSE_200MV"),
            (0b1010_0000, "SENSE_250MV"),
            (0b1100_0000, "SENSE_300MV"),
            (0b1110_0000, "SENSE_400MV"),
        ],
    ),
    // Desaturation current source
    group(
        0b0001_1000,
        &[
            (0b0000_0000, "DESAT_CUR_250UA"),
            (0b0000_1000, "DESAT_CUR_500UA"),
            (0b0001_0000, "DESAT_CUR_750UA"),
            (0b0001_1000, "DESAT_CUR_1000UA"),
        ],
    ),
    // Desaturation threshold
    group(
        0b0000_0111,
        &[
            (0b0000_0000, "DESAT_TH_3V"),
            (0b0000_0001, "DESAT_TH_4V"),
            (0b0000_0010, "DESAT_TH_5V"),
            (0b0000_0011, "DESAT_TH_6V"),
            (0b0000_0100, "DESAT_TH_7V"),
            (0b0000_0101, "DESAT_TH_8V"),
            (0b0000_0110, "DESAT_TH_9V"),
            (0b0000_0111, "DESAT_TH_10V"),
        ],
    ),
];

const CFG3: &[FieldGroup] = &[
    // 2-level turn-off threshold
    group(
        0b1111_0000,
        &[
            (0b0000_0000, "2LTO_TH_7V"),
            (0b0001_0000, "2LTO_TH_7_5V"),
            (0b0010_0000, "2LTO_TH_8V"),
            (0b0011_0000, "2LTO_TH_8_5V"),
            (0b0100_0000, "2LTO_TH_9V"),
            (0b0101_0000, "2LTO_TH_9_5V"),
            (0b0110_0000, "2LTO_TH_10V"),
            (0b0111_0000, "2LTO_TH_10_5V"),
            (0b1000_0000, "2LTO_TH_11V"),
            (0b1001_0000, "2LTO_TH_11_5V"),
            (0b1010_0000, "2LTO_TH_12V"),
            (0b1011_0000, "2LTO_TH_12_5V"),
            (0b1100_0000, "2LTO_TH_13V"),
            (0b1101_0000, "2LTO_TH_13_5V"),
            (0b1110_0000, "2LTO_TH_14V"),
            (0b1111_0000, "2LTO_TH_14_5V"),
        ],
    ),
    // 2-level turn-off time
    group(
        0b0000_1111,
        &[
            (0b0000_0000, "2LTO_TIME_DISABLED"),
            (0b0000_0001, "2LTO_TIME_0_75US"),
            (0b0000_0010, "2LTO_TIME_1_00US"),
            (0b0000_0011, "2LTO_TIME_1_50US"),
            (0b0000_0100, "2LTO_TIME_2_00US"),
            (0b0000_0101, "2LTO_TIME_2_50US"),
            (0b0000_0110, "2LTO_TIME_3_00US"),
            (0b0000_0111, "2LTO_TIME_3_50US"),
            (0b0000_1000, "2LTO_TIME_3_75US"),
            (0b0000_1001, "2LTO_TIME_4_00US"),
            (0b0000_1010, "2LTO_TIME_4_25US"),
            (0b0000_1011, "2LTO_TIME_4_50US"),
            (0b0000_1100, "2LTO_TIME_4_75US"),
            (0b0000_1101, "2LTO_TIME_5_00US"),
            (0b0000_1110, "2LTO_TIME_5_25US"),
            (0b0000_1111, "2LTO_TIME_5_50US"),
        ],
    ),
];

const CFG4: &[FieldGroup] = &[
    flag(0b0010_0000, "OVLO_EN"),
    flag(0b0001_0000, "UVLO_LATCHED"),
    // VL negative supply UVLO threshold
    group(
        0b0000_1100,
        &[
            (0b0000_0000, "VLON_TH_DISABLED"),
            (0b0000_0100, "VLON_TH_NEG_3V"),
            (0b0000_1000, "VLON_TH_NEG_5V"),
            (0b0000_1100, "VLON_TH_NEG_7V"),
        ],
    ),
    // VH positive supply UVLO threshold
    group(
        0b0000_0011,
        &[
            (0b0000_0000, "VHON_TH_DISABLED"),
            (0b0000_0001, "VHON_TH_10V"),
            (0b0000_0010, "VHON_TH_12V"),
            (0b0000_0011, "VHON_TH_14V"),
        ],
    ),
];

const CFG5: &[FieldGroup] = &[
    flag(0b0000_1000, "2LTO_EN"),
    flag(0b0000_0100, "CLAMP_EN"),
    flag(0b0000_0010, "DESAT_EN"),
    flag(0b0000_0001, "SENSE_EN"),
];

const STATUS1: &[FieldGroup] = &[
    flag(0b1000_0000, "OVLOH"),
    flag(0b0100_0000, "OVLOL"),
    flag(0b0010_0000, "DESAT"),
    flag(0b0001_0000, "SENSE"),
    flag(0b0000_1000, "UVLOH"),
    flag(0b0000_0100, "UVLOL"),
    flag(0b0000_0010, "TSD"),
    flag(0b0000_0001, "TWN"),
];

// Bit 0 unused
const STATUS2: &[FieldGroup] = &[flag(0b0000_0100, "REGERRR"), flag(0b0000_0010, "ASC")];

const STATUS3: &[FieldGroup] = &[
    flag(0b0001_0000, "DT_ERR"),
    flag(0b0000_1000, "SPI_ERR"),
    flag(0b0000_0100, "REGERRL"),
    flag(0b0000_0010, "OVLOD"),
    flag(0b0000_0001, "UVLOD"),
];

const TEST1: &[FieldGroup] = &[
    flag(0b0001_0000, "GOFFCHK"),
    flag(0b0000_1000, "GONCHK"),
    flag(0b0000_0100, "DESCHK"),
    flag(0b0000_0010, "SNSCHK"),
    flag(0b0000_0001, "RCHK"),
];

// DIAG1CFG and DIAG2CFG share a layout
const DIAGCFG: &[FieldGroup] = &[
    flag(0b1000_0000, "SPI_REG_ERR"),
    flag(0b0100_0000, "UVLOD_OVLOD"),
    flag(0b0010_0000, "UVLOH_UVLOL"),
    flag(0b0001_0000, "OVLOH_OVLOL"),
    flag(0b0000_1000, "DESAT_SENSE"),
    flag(0b0000_0100, "ASC_DT_ERR"),
    flag(0b0000_0010, "TSD"),
    flag(0b0000_0001, "TWN"),
];

/// All registers known to the decoder
pub const REGISTERS: &[RegisterDefinition] = &[
    RegisterDefinition { address: 0x0C, name: "CFG1", fields: CFG1 },
    RegisterDefinition { address: 0x1D, name: "CFG2", fields: CFG2 },
    RegisterDefinition { address: 0x1E, name: "CFG3", fields: CFG3 },
    RegisterDefinition { address: 0x1F, name: "CFG4", fields: CFG4 },
    RegisterDefinition { address: 0x19, name: "CFG5", fields: CFG5 },
    RegisterDefinition { address: 0x02, name: "STATUS1", fields: STATUS1 },
    RegisterDefinition { address: 0x01, name: "STATUS2", fields: STATUS2 },
    RegisterDefinition { address: 0x0A, name: "STATUS3", fields: STATUS3 },
    RegisterDefinition { address: 0x11, name: "TEST1", fields: TEST1 },
    RegisterDefinition { address: 0x05, name: "DIAG1CFG", fields: DIAGCFG },
    RegisterDefinition { address: 0x06, name: "DIAG2CFG", fields: DIAGCFG },
];

/// Look up the name of a fixed-opcode command
pub fn command_name(opcode: u8) -> Option<&'static str> {
    COMMANDS
        .iter()
        .find(|(code, _)| *code == opcode)
        .map(|(_, name)| *name)
}

/// Look up a register definition by address
pub fn register(address: u8) -> Option<&'static RegisterDefinition> {
    REGISTERS.iter().find(|reg| reg.address == address)
}

/// Display label for a register address
///
/// Unknown addresses are rendered with their raw value so they stay
/// identifiable in the decoded text.
pub fn register_label(address: u8) -> String {
    match register(address) {
        Some(reg) => reg.name.to_string(),
        None => format!("unknown register 0x{:02X}", address),
    }
}

/// Interpretation of a MOSI byte received while a device expects a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// One of the fixed commands
    Command(&'static str),
    /// Read of the given register address
    ReadRegister(u8),
    /// Write of the given register address
    WriteRegister(u8),
    /// Matches none of the known patterns
    Unknown(u8),
}

impl Opcode {
    /// Classify an opcode; exact command matches take priority over the
    /// register read/write patterns
    pub fn classify(byte: u8) -> Self {
        if let Some(name) = command_name(byte) {
            return Opcode::Command(name);
        }
        match byte & CMD_REG_MASK {
            CMD_READ_REG => Opcode::ReadRegister(byte & REG_ADDR_MASK),
            CMD_WRITE_REG => Opcode::WriteRegister(byte & REG_ADDR_MASK),
            _ => Opcode::Unknown(byte),
        }
    }
}
