//! IP address validator

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde_json::Value;

use crate::schema::{ValidationError, ValidationResult};

/// Validates IPv4 and IPv6 addresses.
///
/// With `store_binary` the address is stored as an array of 4 or 16 octets
/// and rendered back to text by `serialize`. IPv4-mapped IPv6 addresses are
/// stored as 4 octets.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpValidator {
    pub store_binary: bool,
}

impl IpValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_binary(mut self) -> Self {
        self.store_binary = true;
        self
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        match value {
            Value::String(s) => {
                let ip: IpAddr = s
                    .parse()
                    .map_err(|_| ValidationError::invalid("invalid IP format"))?;
                if self.store_binary {
                    Ok(to_octets(ip))
                } else {
                    Ok(Value::String(ip.to_string()))
                }
            }
            Value::Array(_) if self.store_binary => from_octets(&value).map(|_| value),
            _ => Err(ValidationError::invalid("invalid type")),
        }
    }

    pub(crate) fn serialize(&self, value: Value) -> ValidationResult<Value> {
        if !self.store_binary {
            return Ok(value);
        }
        from_octets(&value).map(|ip| Value::String(ip.to_string()))
    }
}

fn to_octets(ip: IpAddr) -> Value {
    let octets: Vec<u8> = match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.octets().to_vec(),
            None => v6.octets().to_vec(),
        },
    };
    Value::Array(octets.into_iter().map(Value::from).collect())
}

fn from_octets(value: &Value) -> ValidationResult<IpAddr> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::invalid("invalid type"))?;
    let octets = items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| ValidationError::invalid("invalid type"))
        })
        .collect::<ValidationResult<Vec<u8>>>()?;

    if let Ok(v4) = <[u8; 4]>::try_from(octets.as_slice()) {
        return Ok(IpAddr::V4(Ipv4Addr::from(v4)));
    }
    if let Ok(v6) = <[u8; 16]>::try_from(octets.as_slice()) {
        return Ok(IpAddr::V6(Ipv6Addr::from(v6)));
    }
    Err(ValidationError::invalid("invalid size"))
}
