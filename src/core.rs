use crate::instruction::{Instruction, Mode, WarriorId};

/// Default number of cells in the core.
pub const MEMORY_SIZE: usize = 8192;

/// Width of one cell in [`Core::to_bytes`].
pub const CELL_BYTES: usize = 14;

/// The circular memory shared by all warriors of a match.
///
/// Every address computation wraps modulo the core size. A cell is either
/// empty (`None`) or holds an [`Instruction`]. Only the owning match writes
/// to the core; observers get `&Core`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Core {
    cells: Vec<Option<Instruction>>,
}

impl Core {
    /// Create an empty core of `size` cells. `size` must be positive.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "core size must be positive");
        Self {
            cells: vec![None; size],
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Normalize any signed value into `[0, size)`.
    pub fn wrap(&self, value: i64) -> usize {
        value.rem_euclid(self.cells.len() as i64) as usize
    }

    /// `(base + offset) mod size`, safe for any `offset`.
    pub fn offset(&self, base: usize, offset: i64) -> usize {
        (base % self.size() + self.wrap(offset)) % self.size()
    }

    pub fn get(&self, address: usize) -> Option<Instruction> {
        self.cells[address % self.size()]
    }

    pub(crate) fn set(&mut self, address: usize, instr: Instruction) {
        let size = self.size();
        self.cells[address % size] = Some(instr);
    }

    pub fn cells(&self) -> &[Option<Instruction>] {
        &self.cells
    }

    /// B-field of the cell at `address`, or 0 if the cell is empty.
    pub fn b_field(&self, address: usize) -> i64 {
        self.get(address).map_or(0, |instr| instr.b_value)
    }

    pub fn owner(&self, address: usize) -> Option<WarriorId> {
        self.get(address).and_then(|instr| instr.owner)
    }

    /// Lowest address whose cell is owned by `warrior`.
    pub fn first_owned_by(&self, warrior: WarriorId) -> Option<usize> {
        self.cells
            .iter()
            .position(|cell| cell.is_some_and(|instr| instr.owner == Some(warrior)))
    }

    /// The location an operand denotes, or `None` for an immediate operand.
    ///
    /// Indirect operands read the B-field at `ip + value` and add it to the
    /// original `ip`, not to the intermediate address.
    pub fn effective_address(&self, ip: usize, mode: Mode, value: i64) -> Option<usize> {
        match mode {
            Mode::Immediate => None,
            Mode::Direct => Some(self.offset(ip, value)),
            Mode::Indirect => {
                let intermediate = self.offset(ip, value);
                Some(self.offset(ip, self.b_field(intermediate)))
            }
        }
    }

    /// The numeric value of an operand.
    ///
    /// Memory operands always yield the B-field of the referenced cell,
    /// whether the operand sits in the A or the B position.
    pub fn operand_value(&self, ip: usize, mode: Mode, value: i64) -> i64 {
        match self.effective_address(ip, mode, value) {
            None => value,
            Some(address) => self.b_field(address),
        }
    }

    /// Number of non-empty cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Flat byte encoding of the core, one fixed-width record per cell.
    ///
    /// Layout per cell: tag (0 empty, 1 + opcode index), packed modes, owner
    /// (`u32`, 0 for none), then A and B values as `u32` after wrapping into
    /// the core. All multi-byte fields are little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size() * CELL_BYTES);
        for cell in &self.cells {
            match cell {
                None => out.extend_from_slice(&[0; CELL_BYTES]),
                Some(instr) => {
                    out.push(1 + instr.opcode as u8);
                    out.push((instr.a_mode as u8) << 4 | instr.b_mode as u8);
                    out.extend_from_slice(&instr.owner.map_or(0, |w| w.wrapping_add(1)).to_le_bytes());
                    out.extend_from_slice(&(self.wrap(instr.a_value) as u32).to_le_bytes());
                    out.extend_from_slice(&(self.wrap(instr.b_value) as u32).to_le_bytes());
                }
            }
        }
        out
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new(MEMORY_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;

    #[test]
    fn test_direct_wraps_forward() {
        let core = Core::default();
        assert_eq!(core.effective_address(8190, Mode::Direct, 5), Some(3));
    }

    #[test]
    fn test_direct_wraps_backward() {
        let core = Core::default();
        assert_eq!(core.effective_address(1, Mode::Direct, -3), Some(8190));
        assert_eq!(core.effective_address(0, Mode::Direct, -8192 * 3 - 1), Some(8191));
    }

    #[test]
    fn test_immediate_has_no_address() {
        let core = Core::default();
        assert_eq!(core.effective_address(10, Mode::Immediate, 5), None);
    }

    #[test]
    fn test_indirect_adds_to_original_ip() {
        let mut core = Core::default();
        core.set(102, Instruction::dat(0, 50));
        assert_eq!(core.effective_address(100, Mode::Indirect, 2), Some(150));
    }

    #[test]
    fn test_indirect_through_empty_cell() {
        let core = Core::default();
        assert_eq!(core.effective_address(100, Mode::Indirect, 2), Some(100));
    }

    #[test]
    fn test_indirect_negative_b_field_wraps() {
        let mut core = Core::default();
        core.set(5, Instruction::dat(0, -10));
        assert_eq!(core.effective_address(3, Mode::Indirect, 2), Some(8185));
    }

    #[test]
    fn test_operand_value_immediate_is_literal() {
        let core = Core::default();
        assert_eq!(core.operand_value(0, Mode::Immediate, -7), -7);
    }

    #[test]
    fn test_operand_value_reads_b_field() {
        let mut core = Core::default();
        core.set(12, Instruction::new(Opcode::Mov, Mode::Direct, 99, Mode::Direct, 4));
        assert_eq!(core.operand_value(10, Mode::Direct, 2), 4);
        assert_eq!(core.operand_value(10, Mode::Direct, 3), 0);
    }

    #[test]
    fn test_first_owned_by_lowest_address() {
        let mut core = Core::new(16);
        core.set(9, Instruction::dat(0, 0).with_owner(Some(2)));
        core.set(4, Instruction::dat(0, 0).with_owner(Some(2)));
        core.set(1, Instruction::dat(0, 0).with_owner(Some(1)));
        assert_eq!(core.first_owned_by(2), Some(4));
        assert_eq!(core.first_owned_by(1), Some(1));
        assert_eq!(core.first_owned_by(3), None);
    }

    #[test]
    fn test_to_bytes_length_and_empty() {
        let mut core = Core::new(8);
        assert!(core.to_bytes().iter().all(|&b| b == 0));
        core.set(0, Instruction::dat(0, 1));
        let bytes = core.to_bytes();
        assert_eq!(bytes.len(), 8 * CELL_BYTES);
        assert_eq!(bytes[0], 1 + Opcode::Dat as u8);
        assert_eq!(core.occupied(), 1);
    }

    #[test]
    fn test_to_bytes_keeps_wide_owners_and_values_apart() {
        let mut low = Core::new(100_000);
        let mut high = Core::new(100_000);
        low.set(0, Instruction::dat(0, 1).with_owner(Some(1)));
        high.set(0, Instruction::dat(0, 1).with_owner(Some(257)));
        assert_ne!(low.to_bytes(), high.to_bytes());

        let mut near = Core::new(100_000);
        let mut far = Core::new(100_000);
        near.set(0, Instruction::dat(0, 1));
        far.set(0, Instruction::dat(0, 1 + 65_536));
        assert_ne!(near.to_bytes(), far.to_bytes());
    }
}
