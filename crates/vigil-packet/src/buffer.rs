/// A byte buffer that holds a mutable or immutable byte slice.
///
/// Packet views validate the minimum length of the underlying slice when they
/// are created, so fixed-offset header reads and writes stay in bounds.
/// Variable-length regions go through [`Buffer::tail`] and
/// [`Buffer::copy_into`], which never index past the end of the slice.
#[derive(Debug)]
pub enum Buffer<'a> {
    Immutable(&'a [u8]),
    Mutable(&'a mut [u8]),
}

impl Buffer<'_> {
    /// Access the buffer as an immutable slice of bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Immutable(packet) => packet,
            Buffer::Mutable(packet) => packet,
        }
    }

    /// The length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Get N bytes from the packet at a given byte offset.
    pub fn get_bytes<const N: usize>(&self, offset: usize) -> [u8; N] {
        core::array::from_fn(|i| self.read(offset + i))
    }

    /// Set N bytes in the packet at a given offset.
    pub fn set_bytes<const N: usize>(&mut self, offset: usize, bytes: [u8; N]) {
        for (i, b) in bytes.into_iter().enumerate() {
            *self.write(offset + i) = b;
        }
    }

    /// Get the value at a given offset.
    pub fn read(&self, offset: usize) -> u8 {
        self.as_slice()[offset]
    }

    /// Set the value at a given offset.
    pub fn write(&mut self, offset: usize) -> &mut u8 {
        match self {
            Buffer::Immutable(_) => panic!("write operation called on readonly buffer"),
            Buffer::Mutable(packet) => &mut packet[offset],
        }
    }

    /// The bytes from `offset` to the end of the buffer, empty if `offset` is out of range.
    pub fn tail(&self, offset: usize) -> &[u8] {
        self.as_slice().get(offset..).unwrap_or_default()
    }

    /// Copy `vals` into the buffer at `offset`.
    ///
    /// Returns the number of bytes that did not fit, zero if all were copied.
    pub fn copy_into(&mut self, offset: usize, vals: &[u8]) -> usize {
        match self {
            Buffer::Immutable(_) => panic!("write operation called on readonly buffer"),
            Buffer::Mutable(packet) => {
                let available = packet.len().saturating_sub(offset);
                let n = available.min(vals.len());
                if n > 0 {
                    packet[offset..offset + n].copy_from_slice(&vals[..n]);
                }
                vals.len() - n
            }
        }
    }
}
