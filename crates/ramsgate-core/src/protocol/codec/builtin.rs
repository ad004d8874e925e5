//! Stock codec registrations for the RAMSES-II codes the engine ships
//! with. Payload shapes follow the upstream protocol: temperatures are
//! centi-degrees (0x7FFF = sensor fault), demand levels are half-percent
//! steps.

use serde_json::{Value, json};

use super::error::{DecodeError, RegistryConflict};
use super::table::{CodecEntry, CodecTable, CodecTableBuilder};
use crate::protocol::device::DeviceClass;
use crate::protocol::frame::Code;

const SYSTEM_MODES: [&str; 8] = [
    "auto",
    "heat_off",
    "eco_boost",
    "away",
    "day_off",
    "day_off_eco",
    "auto_with_reset",
    "custom",
];

/// Build the default codec table.
pub fn default_table() -> Result<CodecTable, RegistryConflict> {
    let mut builder = CodecTableBuilder::new();
    builder
        .register(
            Code::SYNC_CYCLE,
            None,
            CodecEntry {
                expected_len: Some(3),
                decode: decode_sync_cycle,
                encode: encode_sync_cycle,
            },
        )?
        .register(
            Code::SETPOINT,
            None,
            CodecEntry {
                expected_len: Some(3),
                decode: decode_setpoint,
                encode: encode_setpoint,
            },
        )?
        .register(
            Code::ZONE_TEMP,
            None,
            CodecEntry {
                expected_len: Some(3),
                decode: decode_zone_temp,
                encode: encode_zone_temp,
            },
        )?
        .register(
            Code::DHW_TEMP,
            None,
            CodecEntry {
                expected_len: Some(3),
                decode: decode_dhw_temp,
                encode: encode_dhw_temp,
            },
        )?
        .register(
            Code::RELAY_DEMAND,
            None,
            CodecEntry {
                expected_len: Some(2),
                decode: decode_relay_demand,
                encode: encode_relay_demand,
            },
        )?
        .register(
            Code::WINDOW_STATE,
            None,
            CodecEntry {
                expected_len: Some(3),
                decode: decode_window_state,
                encode: encode_window_state,
            },
        )?
        .register(
            Code::SYSTEM_MODE,
            None,
            CodecEntry {
                expected_len: Some(8),
                decode: decode_system_mode,
                encode: encode_system_mode,
            },
        )?
        .register(
            Code::ACTUATOR_STATE,
            None,
            CodecEntry {
                expected_len: Some(3),
                decode: decode_actuator_state,
                encode: encode_actuator_state,
            },
        )?
        .register(
            Code::HEAT_DEMAND,
            None,
            CodecEntry {
                expected_len: Some(2),
                decode: decode_heat_demand,
                encode: encode_heat_demand,
            },
        )?
        // UFH controllers broadcast heat demand as an array of zone pairs.
        .register(
            Code::HEAT_DEMAND,
            Some(DeviceClass::UfhController),
            CodecEntry {
                expected_len: None,
                decode: decode_heat_demand_array,
                encode: encode_heat_demand_array,
            },
        )?;
    Ok(builder.build())
}

fn byte_at(payload: &[u8], at: usize) -> Result<u8, DecodeError> {
    payload.get(at).copied().ok_or_else(|| {
        DecodeError::out_of_domain(format!("payload too short for byte at {at}"))
    })
}

fn be_u16(payload: &[u8], at: usize) -> Result<u16, DecodeError> {
    match (payload.get(at), payload.get(at + 1)) {
        (Some(hi), Some(lo)) => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(DecodeError::out_of_domain(format!(
            "payload too short for u16 at {at}"
        ))),
    }
}

fn idx_str(byte: u8) -> String {
    format!("{byte:02X}")
}

fn idx_from(value: &Value, field: &'static str, default: u8) -> Result<u8, DecodeError> {
    match value.get(field) {
        None => Ok(default),
        Some(Value::String(token)) => {
            u8::from_str_radix(token, 16).map_err(|_| DecodeError::BadField { field })
        }
        Some(_) => Err(DecodeError::BadField { field }),
    }
}

fn f64_field(value: &Value, field: &'static str) -> Result<f64, DecodeError> {
    value
        .get(field)
        .and_then(Value::as_f64)
        .ok_or(DecodeError::BadField { field })
}

fn str_field<'a>(value: &'a Value, field: &'static str) -> Result<&'a str, DecodeError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or(DecodeError::BadField { field })
}

/// Centi-degree temperature; 0x7FFF marks a faulted sensor.
fn temp_from(raw: u16) -> Value {
    if raw == 0x7FFF {
        Value::Null
    } else {
        json!((raw as i16) as f64 / 100.0)
    }
}

fn temp_to(value: &Value, field: &'static str, min: f64, max: f64) -> Result<u16, DecodeError> {
    match value.get(field) {
        Some(Value::Null) => Ok(0x7FFF),
        _ => {
            let degrees = f64_field(value, field)?;
            if !(min..=max).contains(&degrees) {
                return Err(DecodeError::out_of_domain(format!(
                    "{field} {degrees} outside {min}..={max}"
                )));
            }
            Ok(((degrees * 100.0).round() as i16) as u16)
        }
    }
}

/// Half-percent demand level; values above 200 are out of domain.
fn demand_from(raw: u8) -> Result<Value, DecodeError> {
    if raw > 200 {
        return Err(DecodeError::out_of_domain(format!(
            "demand byte {raw:#04X} above 0xC8"
        )));
    }
    Ok(json!(raw as f64 / 2.0))
}

fn demand_to(value: &Value, field: &'static str) -> Result<u8, DecodeError> {
    let percent = f64_field(value, field)?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(DecodeError::out_of_domain(format!(
            "{field} {percent} outside 0..=100"
        )));
    }
    Ok((percent * 2.0).round() as u8)
}

fn decode_sync_cycle(payload: &[u8]) -> Result<Value, DecodeError> {
    Ok(json!({
        "domain_id": idx_str(byte_at(payload, 0)?),
        "remaining_seconds": be_u16(payload, 1)? as f64 / 10.0,
    }))
}

fn encode_sync_cycle(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let seconds = f64_field(value, "remaining_seconds")?;
    if !(0.0..=6553.5).contains(&seconds) {
        return Err(DecodeError::out_of_domain(format!(
            "remaining_seconds {seconds} outside 0..=6553.5"
        )));
    }
    let idx = idx_from(value, "domain_id", 0x00)?;
    let raw = ((seconds * 10.0).round() as u16).to_be_bytes();
    Ok(vec![idx, raw[0], raw[1]])
}

fn decode_setpoint(payload: &[u8]) -> Result<Value, DecodeError> {
    Ok(json!({
        "zone_idx": idx_str(byte_at(payload, 0)?),
        "setpoint": temp_from(be_u16(payload, 1)?),
    }))
}

fn encode_setpoint(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let idx = idx_from(value, "zone_idx", 0x00)?;
    let raw = temp_to(value, "setpoint", 5.0, 35.0)?.to_be_bytes();
    Ok(vec![idx, raw[0], raw[1]])
}

fn decode_zone_temp(payload: &[u8]) -> Result<Value, DecodeError> {
    Ok(json!({
        "zone_idx": idx_str(byte_at(payload, 0)?),
        "temperature": temp_from(be_u16(payload, 1)?),
    }))
}

fn encode_zone_temp(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let idx = idx_from(value, "zone_idx", 0x00)?;
    let raw = temp_to(value, "temperature", -20.0, 60.0)?.to_be_bytes();
    Ok(vec![idx, raw[0], raw[1]])
}

fn decode_dhw_temp(payload: &[u8]) -> Result<Value, DecodeError> {
    Ok(json!({
        "dhw_idx": idx_str(byte_at(payload, 0)?),
        "temperature": temp_from(be_u16(payload, 1)?),
    }))
}

fn encode_dhw_temp(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let idx = idx_from(value, "dhw_idx", 0x00)?;
    let raw = temp_to(value, "temperature", 0.0, 99.0)?.to_be_bytes();
    Ok(vec![idx, raw[0], raw[1]])
}

fn decode_relay_demand(payload: &[u8]) -> Result<Value, DecodeError> {
    Ok(json!({
        "domain_id": idx_str(byte_at(payload, 0)?),
        "relay_demand": demand_from(byte_at(payload, 1)?)?,
    }))
}

fn encode_relay_demand(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let idx = idx_from(value, "domain_id", 0xFC)?;
    Ok(vec![idx, demand_to(value, "relay_demand")?])
}

fn decode_window_state(payload: &[u8]) -> Result<Value, DecodeError> {
    let open = match be_u16(payload, 1)? {
        0x0000 => false,
        0xC800 => true,
        raw => {
            return Err(DecodeError::out_of_domain(format!(
                "window state {raw:#06X} is neither open nor closed"
            )));
        }
    };
    Ok(json!({
        "zone_idx": idx_str(byte_at(payload, 0)?),
        "window_open": open,
    }))
}

fn encode_window_state(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let idx = idx_from(value, "zone_idx", 0x00)?;
    let open = value
        .get("window_open")
        .and_then(Value::as_bool)
        .ok_or(DecodeError::BadField {
            field: "window_open",
        })?;
    let raw: u16 = if open { 0xC800 } else { 0x0000 };
    let raw = raw.to_be_bytes();
    Ok(vec![idx, raw[0], raw[1]])
}

fn decode_system_mode(payload: &[u8]) -> Result<Value, DecodeError> {
    let first = byte_at(payload, 0)?;
    let mode = SYSTEM_MODES
        .get(first as usize)
        .ok_or_else(|| DecodeError::out_of_domain(format!("system mode {first:#04X}")))?;
    let until: String = payload[1..].iter().map(|b| format!("{b:02X}")).collect();
    Ok(json!({
        "system_mode": mode,
        "until_raw": until,
    }))
}

fn encode_system_mode(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let mode = str_field(value, "system_mode")?;
    let byte = SYSTEM_MODES
        .iter()
        .position(|name| *name == mode)
        .ok_or_else(|| DecodeError::out_of_domain(format!("unknown system mode {mode:?}")))?
        as u8;
    let until = match value.get("until_raw") {
        None => vec![0xFF; 7],
        // ASCII guard first: a non-ASCII string can still be 14 bytes
        // long, and slicing it would trip a char boundary.
        Some(Value::String(hex)) if hex.is_ascii() && hex.len() == 14 => (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| DecodeError::BadField { field: "until_raw" })?,
        Some(_) => return Err(DecodeError::BadField { field: "until_raw" }),
    };
    let mut payload = vec![byte];
    payload.extend_from_slice(&until);
    Ok(payload)
}

fn decode_actuator_state(payload: &[u8]) -> Result<Value, DecodeError> {
    let modulation = match byte_at(payload, 1)? {
        0xFF => Value::Null,
        raw => demand_from(raw)?,
    };
    Ok(json!({
        "domain_id": idx_str(byte_at(payload, 0)?),
        "modulation_level": modulation,
        "flags_raw": idx_str(byte_at(payload, 2)?),
    }))
}

fn encode_actuator_state(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let idx = idx_from(value, "domain_id", 0x00)?;
    let modulation = match value.get("modulation_level") {
        Some(Value::Null) => 0xFF,
        _ => demand_to(value, "modulation_level")?,
    };
    let flags = idx_from(value, "flags_raw", 0x10)?;
    Ok(vec![idx, modulation, flags])
}

fn decode_heat_demand(payload: &[u8]) -> Result<Value, DecodeError> {
    Ok(json!({
        "zone_idx": idx_str(byte_at(payload, 0)?),
        "heat_demand": demand_from(byte_at(payload, 1)?)?,
    }))
}

fn encode_heat_demand(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let idx = idx_from(value, "zone_idx", 0x00)?;
    Ok(vec![idx, demand_to(value, "heat_demand")?])
}

fn decode_heat_demand_array(payload: &[u8]) -> Result<Value, DecodeError> {
    if payload.is_empty() || payload.len() % 2 != 0 {
        return Err(DecodeError::out_of_domain(format!(
            "heat demand array needs zone pairs, got {} bytes",
            payload.len()
        )));
    }
    let zones = payload
        .chunks_exact(2)
        .map(|pair| {
            Ok(json!({
                "zone_idx": idx_str(pair[0]),
                "heat_demand": demand_from(pair[1])?,
            }))
        })
        .collect::<Result<Vec<Value>, DecodeError>>()?;
    Ok(Value::Array(zones))
}

fn encode_heat_demand_array(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let zones = value.as_array().ok_or(DecodeError::BadField { field: "zones" })?;
    let mut payload = Vec::with_capacity(zones.len() * 2);
    for zone in zones {
        payload.push(idx_from(zone, "zone_idx", 0x00)?);
        payload.push(demand_to(zone, "heat_demand")?);
    }
    if payload.is_empty() {
        return Err(DecodeError::out_of_domain("empty heat demand array"));
    }
    Ok(payload)
}
