#![allow(dead_code)]

/// Writes fields least-significant bit first, as the bit cursor reads them.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bits(&mut self, value: u32, width: u32) -> &mut Self {
        for i in 0..width {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 == 1 {
                *self.bytes.last_mut().unwrap() |= 1 << (self.bits % 8);
            }
            self.bits += 1;
        }
        self
    }

    /// A tag in its shortest encoding.
    pub fn tag(&mut self, tag: u32) -> &mut Self {
        let (prefix, width) = match tag {
            0..16 => return self.bits(tag, 6),
            16..256 => (0b01_0000, 4),
            256..4096 => (0b10_0000, 8),
            _ => (0b11_0000, 28),
        };

        self.bits(prefix | (tag & 0xF), 6).bits(tag >> 4, width)
    }

    pub fn varint(&mut self, value: u32) -> &mut Self {
        for b in varint(value) {
            self.bits(u32::from(b), 8);
        }
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.bits(u32::from(b), 8);
        }
        self
    }

    /// A complete `(tag, length, payload)` sub-message.
    pub fn message(&mut self, tag: u32, payload: &[u8]) -> &mut Self {
        self.tag(tag).varint(payload.len() as u32).bytes(payload)
    }

    pub fn len_bits(&self) -> usize {
        self.bits
    }

    pub fn finish(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// Base-128 encoding, least-significant group first.
pub fn varint(mut value: u32) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let group = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(group);
            return out;
        }
        out.push(group | 0x80);
    }
}

/// Builds a demo container: a 16-byte header, then frames.
#[derive(Debug)]
pub struct DemoBuilder {
    bytes: Vec<u8>,
}

impl DemoBuilder {
    pub fn new() -> Self {
        let mut bytes = b"PBDEMS2\0".to_vec();
        bytes.extend([0; 8]);
        Self { bytes }
    }

    pub fn frame(&mut self, command: u32, tick: u32, payload: &[u8]) -> &mut Self {
        self.bytes.extend(varint(command));
        self.bytes.extend(varint(tick));
        self.bytes.extend(varint(payload.len() as u32));
        self.bytes.extend_from_slice(payload);
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}
