//! Multi-port memories: a row-addressable array lowered to `$mem_v2`.

use alloc::{string::String, vec::Vec};

use torii_core::BitPattern;
use torii_ir::{Signal, ValueRef};

use crate::{domain_key::DomainKey, error::MemoryError, fragment::Attrs};

/// A synchronous or asynchronous read port.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPort {
    /// Address presented to the memory array.
    pub addr: ValueRef,
    /// Signal the port's data appears on.
    pub data: Signal,
    /// `Comb` for an asynchronous (combinational) read, `Sync(domain)` for
    /// a registered one.
    pub domain: DomainKey,
    /// Indices, into the owning memory's `write_ports`, of write ports this
    /// read port forwards same-cycle writes from ("transparent" reads).
    pub transparent_for: Vec<usize>,
}

/// A synchronous write port with byte- (or other granule-) level enables.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePort {
    /// Address presented to the memory array.
    pub addr: ValueRef,
    /// Data written when the corresponding enable bit is set.
    pub data: ValueRef,
    /// Per-granule write enable, `data.width() / granularity` bits wide.
    pub en: ValueRef,
    /// Must be `Sync(domain)`: writes are always clocked.
    pub domain: DomainKey,
    /// Number of data bits each `en` bit gates. Must evenly divide the
    /// memory's width.
    pub granularity: u32,
}

/// A multi-port memory array: `depth` rows of `width` bits, read and written
/// through independently configured ports.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryInstance {
    name: String,
    width: u32,
    depth: u32,
    init: Vec<BitPattern>,
    read_ports: Vec<ReadPort>,
    write_ports: Vec<WritePort>,
    attrs: Attrs,
}

impl MemoryInstance {
    /// Construct an uninitialized memory of `depth` rows by `width` bits.
    /// Rows not covered by a later [`Self::with_init`] reset to zero.
    pub fn new(name: impl Into<String>, width: u32, depth: u32) -> Self {
        Self {
            name: name.into(),
            width,
            depth,
            init: Vec::new(),
            read_ports: Vec::new(),
            write_ports: Vec::new(),
            attrs: Attrs::new(),
        }
    }

    /// Attach initial contents. `values` is given low-row-first; any row at
    /// or past `values.len()` resets to zero.
    pub fn with_init(mut self, values: Vec<BitPattern>) -> Result<Self, MemoryError> {
        if values.len() as u32 > self.depth {
            return Err(MemoryError::InitTooLong { memory: self.name.clone(), depth: self.depth, len: values.len() })
        }
        for v in &values {
            if v.width() != self.width {
                return Err(MemoryError::DataWidthMismatch {
                    memory: self.name.clone(),
                    found: v.width(),
                    expected: self.width,
                })
            }
        }
        self.init = values;
        Ok(self)
    }

    /// Add a read port and return its index.
    pub fn add_read_port(
        &mut self,
        addr: ValueRef,
        data: Signal,
        domain: DomainKey,
        transparent_for: Vec<usize>,
    ) -> Result<usize, MemoryError> {
        if data.shape().width() != self.width {
            return Err(MemoryError::DataWidthMismatch {
                memory: self.name.clone(),
                found: data.shape().width(),
                expected: self.width,
            })
        }
        self.read_ports.push(ReadPort { addr, data, domain, transparent_for });
        Ok(self.read_ports.len() - 1)
    }

    /// Add a write port and return its index.
    pub fn add_write_port(
        &mut self,
        addr: ValueRef,
        data: ValueRef,
        en: ValueRef,
        domain: DomainKey,
        granularity: u32,
    ) -> Result<usize, MemoryError> {
        if granularity == 0 || self.width % granularity != 0 {
            return Err(MemoryError::BadGranularity { memory: self.name.clone(), granularity, width: self.width })
        }
        self.write_ports.push(WritePort { addr, data, en, domain, granularity });
        Ok(self.write_ports.len() - 1)
    }

    /// The memory's declared name, used as the `$mem_v2` cell's `MEMID`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bits per row.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Initial row contents, low-row-first. Shorter than `depth` means the
    /// remaining rows reset to zero.
    pub fn init(&self) -> &[BitPattern] {
        &self.init
    }

    /// Read ports, in declaration order — also the order `$mem_v2` port
    /// indices are assigned.
    pub fn read_ports(&self) -> &[ReadPort] {
        &self.read_ports
    }

    /// Write ports, in declaration order.
    pub fn write_ports(&self) -> &[WritePort] {
        &self.write_ports
    }

    /// Free-form attributes on the memory cell itself.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Mutable access to attributes.
    pub fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torii_core::Shape;
    use torii_ir::Value;

    fn addr(width: u32) -> ValueRef {
        Value::Signal(Signal::new("addr", Shape::unsigned(width).unwrap())).into_ref()
    }

    #[test]
    fn read_port_width_must_match() {
        let mut mem = MemoryInstance::new("m", 8, 16);
        let bad_data = Signal::new("d", Shape::unsigned(4).unwrap());
        assert!(mem.add_read_port(addr(4), bad_data, DomainKey::Comb, Vec::new()).is_err());
    }

    #[test]
    fn granularity_must_divide_width() {
        let mut mem = MemoryInstance::new("m", 8, 16);
        let data = Value::Const(torii_ir::Const::new(BitPattern::zero(8), false)).into_ref();
        let en = Value::Const(torii_ir::Const::new(BitPattern::zero(3), false)).into_ref();
        let result = mem.add_write_port(addr(4), data, en, DomainKey::Sync("sync".into()), 3);
        assert!(result.is_err());
    }

    #[test]
    fn init_longer_than_depth_is_rejected() {
        let mem = MemoryInstance::new("m", 8, 2);
        let values = alloc::vec![BitPattern::zero(8); 3];
        assert!(mem.with_init(values).is_err());
    }
}
