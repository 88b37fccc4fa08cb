use crate::error::RosterError;
use crate::instruction::{Instruction, WarriorId};

/// A participant template: an id, a display name and initial code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warrior {
    pub id: WarriorId,
    pub name: &'static str,
    pub code: Vec<Instruction>,
}

/// Built-in warriors as (id, name, code lines).
const ROSTER: &[(WarriorId, &str, &[&str])] = &[
    // Writes a zero literal one cell ahead, then walks into it.
    (1, "imp", &["MOV #0, $1"]),
    // Bombs every 101st cell with its DAT.
    (
        2,
        "dwarf",
        &["ADD #101, $3", "MOV $2, @2", "JMP $-2, $0", "DAT #0, #0"],
    ),
    // Splits a bomber off the main loop on every pass.
    (
        3,
        "splasher",
        &[
            "SPL $3, $0",
            "ADD #17, $4",
            "JMP $-2, $0",
            "MOV $1, @2",
            "DAT #0, #0",
            "DAT #0, #101",
        ],
    ),
    (
        5,
        "hydra",
        &[
            "SPL 3, $0",
            "ADD 4, $4",
            "JMP $-2, $0",
            "MOV 3, @2",
            "JMP $-1, $0",
            "DAT 0, 300",
            "DAT 0, 555",
        ],
    ),
    // Midget, Chip Wendell, 1986 ICWS tournament.
    (
        6,
        "reaper",
        &["MOV $3, @3", "SUB #28, $2", "JMP $-2, #0", "DAT #0, #-980"],
    ),
    // The classic self-copying imp.
    (7, "imp2", &["MOV $0, $1"]),
    (
        8,
        "bomber",
        &["ADD 4, $3", "MOV 3, @2", "JMP $-2, $0", "DAT 0, 300", "DAT 0, 555"],
    ),
];

fn build(id: WarriorId, name: &'static str, lines: &[&str]) -> Result<Warrior, RosterError> {
    let code = lines
        .iter()
        .enumerate()
        .map(|(line, text)| {
            text.parse::<Instruction>()
                .map_err(|source| RosterError::Code {
                    name,
                    line: line + 1,
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Warrior { id, name, code })
}

/// Every built-in warrior, in id order.
pub fn roster() -> Result<Vec<Warrior>, RosterError> {
    ROSTER
        .iter()
        .map(|&(id, name, lines)| build(id, name, lines))
        .collect()
}

/// Look up a built-in warrior by name (case-insensitive).
pub fn by_name(name: &str) -> Result<Warrior, RosterError> {
    let &(id, n, lines) = ROSTER
        .iter()
        .find(|(_, n, _)| n.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| RosterError::UnknownWarrior(name.to_string()))?;
    build(id, n, lines)
}

/// Names of the built-in warriors.
pub fn names() -> impl Iterator<Item = &'static str> {
    ROSTER.iter().map(|&(_, name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Mode, Opcode};
    use crate::loader::Placement;
    use crate::scheduler::{Match, MatchConfig, MatchState};

    #[test]
    fn test_roster_parses() {
        let roster = roster().unwrap();
        assert_eq!(roster.len(), ROSTER.len());
        let mut ids: Vec<_> = roster.iter().map(|w| w.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), roster.len());
        assert!(roster.iter().all(|w| !w.code.is_empty()));
    }

    #[test]
    fn test_by_name() {
        let dwarf = by_name("Dwarf").unwrap();
        assert_eq!(dwarf.id, 2);
        assert_eq!(dwarf.code[1].to_string(), "MOV $2, @2");
        assert!(matches!(by_name("nobody"), Err(RosterError::UnknownWarrior(_))));
    }

    #[test]
    fn test_hydra_unprefixed_operands_are_direct() {
        let hydra = by_name("hydra").unwrap();
        assert_eq!(hydra.code[0].opcode, Opcode::Spl);
        assert_eq!(hydra.code[0].a_mode, Mode::Direct);
        assert_eq!(hydra.code[5].b_value, 300);
    }

    #[test]
    fn test_dwarf_bombs_every_101() {
        let dwarf = by_name("dwarf").unwrap();
        let mut m = Match::load(
            MatchConfig { max_cycles: None, ..Default::default() },
            &[Placement { warrior: dwarf.id, start: 0, code: dwarf.code }],
        )
        .unwrap();
        // Three instructions per bomb. The pointer lives at +3 but the
        // indirect offset is applied to the MOV at +1.
        m.run_cycles(9).unwrap();
        assert_eq!(m.state(), MatchState::Running);
        for bomb in 1..=3 {
            let address = 1 + 101 * bomb;
            let cell = m.core().get(address).unwrap();
            assert_eq!(cell.opcode, Opcode::Dat, "no bomb at {address}");
            assert_eq!(cell.owner, Some(2));
        }
    }

    #[test]
    fn test_names() {
        assert!(names().any(|n| n == "reaper"));
    }
}
