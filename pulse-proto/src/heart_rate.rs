//! Heart Rate Measurement (0x2A37)
//!
//! The record is self-describing: the first byte holds flags that decide which fields
//! follow and how wide the heart rate value is. All multi-byte fields are little-endian.
//!
//! ```text
//! flags (1) | bpm (1 or 2) | energy expended (2, optional) | rr interval (2) *
//! ```

use crate::DecodeError;

// Flag bits
pub const FLAG_VALUE_FORMAT_U16: u8 = 0b0000_0001;
pub const FLAG_CONTACT_STATUS: u8 = 0b0000_0010;
pub const FLAG_CONTACT_SUPPORTED: u8 = 0b0000_0100;
pub const FLAG_ENERGY_EXPENDED: u8 = 0b0000_1000;
pub const FLAG_RR_INTERVAL: u8 = 0b0001_0000;

/// Contact bits as a combined field: supported and detected
const CONTACT_DETECTED: u8 = FLAG_CONTACT_SUPPORTED | FLAG_CONTACT_STATUS;

/// RR intervals are reported in 1/1024 second ticks
pub const RR_TICKS_PER_SECOND: f64 = 1024.0;

/// Whether the sensor is touching skin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    /// The sensor does not report contact
    #[default]
    Unsupported,
    NotDetected,
    Detected,
}

impl ContactStatus {
    fn from_flags(flags: u8) -> Self {
        if flags & FLAG_CONTACT_SUPPORTED == 0 {
            ContactStatus::Unsupported
        } else if flags & CONTACT_DETECTED == CONTACT_DETECTED {
            ContactStatus::Detected
        } else {
            ContactStatus::NotDetected
        }
    }

    fn flags(self) -> u8 {
        match self {
            ContactStatus::Unsupported => 0,
            ContactStatus::NotDetected => FLAG_CONTACT_SUPPORTED,
            ContactStatus::Detected => CONTACT_DETECTED,
        }
    }
}

/// One decoded heart rate measurement
///
/// Every decode produces an independent record; nothing carries over from earlier
/// measurements.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct HeartRateRecord {
    pub beats_per_minute: u16,
    pub contact_status: ContactStatus,
    pub energy_expended_kj: Option<u16>,
    /// Beat-to-beat intervals in seconds, oldest first
    pub rr_intervals: Vec<f64>,
}

/// Cursor over a payload that refuses to read past its end
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                field,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let data = self.data;
        let bytes = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(field, 1)?[0])
    }

    fn u16_le(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        let bytes = self.take(field, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }
}

impl HeartRateRecord {
    /// Decode a measurement payload.
    ///
    /// Bytes left after the flagged fields are ignored unless the RR flag is set, in
    /// which case every remaining byte must belong to a complete 2-byte interval.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        let flags = reader.u8("flags")?;

        let beats_per_minute = if flags & FLAG_VALUE_FORMAT_U16 != 0 {
            reader.u16_le("heart rate")?
        } else {
            reader.u8("heart rate")? as u16
        };

        let contact_status = ContactStatus::from_flags(flags);

        let energy_expended_kj = if flags & FLAG_ENERGY_EXPENDED != 0 {
            Some(reader.u16_le("energy expended")?)
        } else {
            None
        };

        let mut rr_intervals = Vec::new();
        if flags & FLAG_RR_INTERVAL != 0 {
            rr_intervals.reserve(reader.remaining() / 2);
            while reader.remaining() > 0 {
                let ticks = reader.u16_le("rr interval")?;
                rr_intervals.push(ticks as f64 / RR_TICKS_PER_SECOND);
            }
        }

        Ok(Self {
            beats_per_minute,
            contact_status,
            energy_expended_kj,
            rr_intervals,
        })
    }

    /// Encode with the same flag semantics `from_bytes` understands.
    ///
    /// The heart rate uses the 8-bit format whenever it fits. RR intervals are rounded to
    /// the nearest tick.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut flags = self.contact_status.flags();
        let wide = self.beats_per_minute > u8::MAX as u16;
        if wide {
            flags |= FLAG_VALUE_FORMAT_U16;
        }
        if self.energy_expended_kj.is_some() {
            flags |= FLAG_ENERGY_EXPENDED;
        }
        if !self.rr_intervals.is_empty() {
            flags |= FLAG_RR_INTERVAL;
        }

        let mut buf = Vec::with_capacity(5 + self.rr_intervals.len() * 2);
        buf.push(flags);
        if wide {
            buf.extend_from_slice(&self.beats_per_minute.to_le_bytes());
        } else {
            buf.push(self.beats_per_minute as u8);
        }
        if let Some(energy) = self.energy_expended_kj {
            buf.extend_from_slice(&energy.to_le_bytes());
        }
        for rr in &self.rr_intervals {
            let ticks = (rr * RR_TICKS_PER_SECOND).round().clamp(0.0, u16::MAX as f64) as u16;
            buf.extend_from_slice(&ticks.to_le_bytes());
        }
        buf
    }

    pub fn sensor_detected(&self) -> bool {
        self.contact_status == ContactStatus::Detected
    }
}
