//! Runtime bit-list type for generated code.
//!
//! The backing bytes are always the SSZ encoding: little-endian bit order
//! with a single delimiter bit set just past the last element.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitlist {
    bytes: Vec<u8>,
}

impl Bitlist {
    /// An all-zero bit list of `len` bits.
    pub fn with_len(len: usize) -> Self {
        let mut bytes = vec![0u8; len / 8 + 1];
        bytes[len / 8] = 1 << (len % 8);
        Bitlist { bytes }
    }

    /// Wraps delimited bytes. `None` when the delimiter is missing.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        match bytes.last() {
            Some(&last) if last != 0 => Some(Bitlist { bytes }),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self.bytes.last() {
            Some(&last) => (self.bytes.len() - 1) * 8 + 7 - last.leading_zeros() as usize,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<bool> {
        if idx >= self.len() {
            return None;
        }
        Some(self.bytes[idx / 8] & (1 << (idx % 8)) != 0)
    }

    /// Returns `false` when `idx` is out of range.
    pub fn set(&mut self, idx: usize, value: bool) -> bool {
        if idx >= self.len() {
            return false;
        }
        let mask = 1u8 << (idx % 8);
        if value {
            self.bytes[idx / 8] |= mask;
        } else {
            self.bytes[idx / 8] &= !mask;
        }
        true
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for Bitlist {
    fn default() -> Self {
        Bitlist::with_len(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_marks_the_length() {
        assert_eq!(Bitlist::with_len(0).as_bytes(), &[0x01]);
        assert_eq!(Bitlist::with_len(3).as_bytes(), &[0x08]);
        assert_eq!(Bitlist::with_len(8).as_bytes(), &[0x00, 0x01]);
        for n in [0usize, 1, 7, 8, 9, 63, 64, 2048] {
            assert_eq!(Bitlist::with_len(n).len(), n);
        }
        assert!(Bitlist::default().is_empty());
    }

    #[test]
    fn from_bytes_requires_a_delimiter() {
        assert!(Bitlist::from_bytes(Vec::new()).is_none());
        assert!(Bitlist::from_bytes(vec![0x0f, 0x00]).is_none());
        let bits = Bitlist::from_bytes(vec![0xff, 0x03]).expect("delimited");
        assert_eq!(bits.len(), 9);
        assert!((0..9).all(|i| bits.get(i) == Some(true)));
    }

    #[test]
    fn get_and_set_stay_inside_the_list() {
        let mut bits = Bitlist::with_len(10);
        assert!(bits.set(0, true));
        assert!(bits.set(9, true));
        assert!(!bits.set(10, true));
        assert_eq!(bits.get(0), Some(true));
        assert_eq!(bits.get(1), Some(false));
        assert_eq!(bits.get(9), Some(true));
        assert_eq!(bits.get(10), None);
        assert_eq!(bits.len(), 10);
        assert_eq!((0..10).filter(|&i| bits.get(i) == Some(true)).count(), 2);
        assert!(bits.set(9, false));
        assert_eq!(bits.clone().into_bytes(), vec![0x01, 0x04]);
    }
}
