use std::fmt;

/// A snapshot of CPU state for diagnostics and assertions.
///
/// Every field is optional so a test can assert only the registers it cares
/// about: equality compares the fields present on both sides and treats an
/// absent field as a wildcard.
#[derive(Clone, Default)]
pub struct CpuDump {
    pub pc: Option<u16>,
    pub s: Option<u8>,
    pub a: Option<u8>,
    pub x: Option<u8>,
    pub y: Option<u8>,
    /// Last fetched opcode byte.
    pub ir: Option<u8>,
    /// Seven characters `NVBDIZC`, uppercase for a set flag.
    pub status: Option<String>,
    /// Externally counted cycles; the dump itself does not track time.
    pub cycles: Option<u64>,
}

fn both_match<T: PartialEq>(left: &Option<T>, right: &Option<T>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => left == right,
        _ => true,
    }
}

impl PartialEq for CpuDump {
    fn eq(&self, other: &CpuDump) -> bool {
        both_match(&self.pc, &other.pc)
            && both_match(&self.s, &other.s)
            && both_match(&self.a, &other.a)
            && both_match(&self.x, &other.x)
            && both_match(&self.y, &other.y)
            && both_match(&self.ir, &other.ir)
            && both_match(&self.status, &other.status)
            && both_match(&self.cycles, &other.cycles)
    }
}

impl fmt::Debug for CpuDump {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(pc) = self.pc {
            parts.push(format!("pc: {:04x}", pc));
        }
        if let Some(s) = self.s {
            parts.push(format!("s: {:02x}", s));
        }
        if let Some(a) = self.a {
            parts.push(format!("a: {:02x}", a));
        }
        if let Some(x) = self.x {
            parts.push(format!("x: {:02x}", x));
        }
        if let Some(y) = self.y {
            parts.push(format!("y: {:02x}", y));
        }
        if let Some(ir) = self.ir {
            parts.push(format!("ir: {:02x}", ir));
        }
        if let Some(ref status) = self.status {
            parts.push(format!("status: {}", status));
        }
        if let Some(cycles) = self.cycles {
            parts.push(format!("cycles: {}", cycles));
        }
        write!(f, "CpuDump {{ {} }}", parts.join(", "))
    }
}

/// Render `length` bytes starting at `start` as rows of sixteen:
/// `8000: a9 42 ...`.
pub fn hexdump(bytes: &[u8], start: u16, length: usize) -> String {
    let start = start as usize;
    let end = (start + length).min(bytes.len());
    let mut lines = Vec::new();
    let mut row = start;
    while row < end {
        let row_end = (row + 16).min(end);
        let rendered: Vec<String> = bytes[row..row_end]
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect();
        lines.push(format!("{:04x}: {}", row, rendered.join(" ")));
        row = row_end;
    }
    lines.join("\n")
}
