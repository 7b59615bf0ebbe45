//! Register bitfield codec
//!
//! Turns one raw register byte into the list of field names it encodes,
//! walking the register's field groups in their declared order so the output
//! is stable.

use crate::registers::{self, FieldGroup, RegisterDefinition};

/// Returned for addresses missing from the register table
pub const UNKNOWN_REGISTER: &str = "UNKNOWN_REGISTER";

/// Returned when no field produced a token
pub const NONE: &str = "NONE";

/// Decode `byte` as the contents of register `address`
pub fn decode_register(address: u8, byte: u8) -> String {
    match registers::register(address) {
        Some(reg) => decode_with(reg, byte),
        None => UNKNOWN_REGISTER.to_string(),
    }
}

/// Decode `byte` against an explicit register definition
pub fn decode_with(reg: &RegisterDefinition, byte: u8) -> String {
    let tokens = field_tokens(reg, byte);
    if tokens.is_empty() {
        return NONE.to_string();
    }
    tokens.join(", ")
}

/// Field tokens for `byte`, in declared order
pub fn field_tokens(reg: &RegisterDefinition, byte: u8) -> Vec<String> {
    let mut tokens = Vec::with_capacity(reg.fields.len());

    for field in reg.fields {
        match field {
            FieldGroup::Flag { mask, name } => {
                if byte & mask == *mask {
                    tokens.push((*name).to_string());
                }
            }
            FieldGroup::Enum { mask, values } => {
                let bits = byte & mask;
                match values.iter().find(|(value, _)| *value == bits) {
                    Some((_, name)) => tokens.push((*name).to_string()),
                    None => {
                        log::trace!(
                            "{}: no name for bits 0x{:02X} under mask 0x{:02X}",
                            reg.name,
                            bits,
                            mask
                        );
                        tokens.push(format!("UNKNOWN_{:02X}", bits));
                    }
                }
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::REGISTERS;
    use test_case::test_case;

    #[test_case(0x0C, 0x80, "CRC_SPI, DT_DISABLED, IN_FILTER_DISABLED"; "cfg1_crc_spi")]
    #[test_case(0x0C, 0xFF, "CRC_SPI, UVLOD_EN, SD_FLAG, DIAG_EN, DT_1200NS, IN_FILTER_70NS"; "cfg1_all_set")]
    #[test_case(0x0C, 0x15, "DIAG_EN, DT_250NS, IN_FILTER_160NS"; "cfg1_mixed")]
    #[test_case(0x1D, 0x00, "SENSE_100MV, DESAT_CUR_250UA, DESAT_TH_3V"; "cfg2_zero")]
    #[test_case(0x1E, 0x5A, "2LTO_TH_9_5V, 2LTO_TIME_4_25US"; "cfg3")]
    #[test_case(0x1F, 0x36, "OVLO_EN, UVLO_LATCHED, VLON_TH_NEG_3V, VHON_TH_12V"; "cfg4")]
    #[test_case(0x19, 0x01, "SENSE_EN"; "cfg5_sense")]
    #[test_case(0x19, 0x0F, "2LTO_EN, CLAMP_EN, DESAT_EN, SENSE_EN"; "cfg5_all")]
    #[test_case(0x02, 0x22, "DESAT, TSD"; "status1")]
    #[test_case(0x01, 0x01, "NONE"; "status2_unused_bit")]
    #[test_case(0x0A, 0x18, "DT_ERR, SPI_ERR"; "status3")]
    #[test_case(0x11, 0x00, "NONE"; "test1_empty")]
    #[test_case(0x06, 0x81, "SPI_REG_ERR, TWN"; "diag2cfg")]
    fn decodes(address: u8, byte: u8, expected: &str) {
        assert_eq!(decode_register(address, byte), expected);
    }

    #[test]
    fn test_unknown_register_for_every_value() {
        for byte in 0..=u8::MAX {
            assert_eq!(decode_register(0x1B, byte), UNKNOWN_REGISTER);
        }
    }

    #[test]
    fn test_unknown_enum_value_keeps_decoding() {
        static PARTIAL: &[FieldGroup] = &[
            FieldGroup::Enum {
                mask: 0b1100_0000,
                values: &[(0b0000_0000, "MODE_OFF")],
            },
            FieldGroup::Flag {
                mask: 0b0000_0001,
                name: "ENABLE",
            },
        ];
        let reg = RegisterDefinition {
            address: 0x00,
            name: "PARTIAL",
            fields: PARTIAL,
        };
        assert_eq!(decode_with(&reg, 0b1000_0001), "UNKNOWN_80, ENABLE");
        assert_eq!(decode_with(&reg, 0b0000_0000), "MODE_OFF");
    }

    #[test]
    fn test_tokens_follow_declared_order() {
        for reg in REGISTERS {
            for byte in 0..=u8::MAX {
                let decoded = decode_register(reg.address, byte);
                assert_eq!(decoded, decode_register(reg.address, byte));

                // Every emitted token must come from a later field than the one before it
                let mut last_field = None;
                for token in field_tokens(reg, byte) {
                    let index = reg
                        .fields
                        .iter()
                        .position(|field| match field {
                            FieldGroup::Flag { name, .. } => *name == token,
                            FieldGroup::Enum { values, .. } => {
                                values.iter().any(|(_, name)| *name == token)
                            }
                        })
                        .expect("token belongs to a field");
                    if let Some(last) = last_field {
                        assert!(index > last, "{}: {} out of order", reg.name, token);
                    }
                    last_field = Some(index);
                }
            }
        }
    }
}
