//! Example machines bundled with the library.

use crate::description::Machine;
use crate::loader::MachineLoader;
use crate::types::MachinationError;
use tracing::warn;

// Default embedded machines
const MACHINE_TEXTS: [&str; 4] = [
    include_str!("../demos/flip-bits.json"),
    include_str!("../demos/binary-increment.mt"),
    include_str!("../demos/append-first.mt"),
    include_str!("../demos/shift-right.mt"),
];

lazy_static::lazy_static! {
    pub static ref MACHINES: Vec<Machine> = MACHINE_TEXTS
        .iter()
        .filter_map(|text| match MachineLoader::load_machine_from_string(text) {
            Ok(machine) => Some(machine),
            Err(e) => {
                warn!("Failed to parse bundled machine: {e}");
                None
            }
        })
        .collect();
}

/// Summary of a bundled machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInfo {
    pub index: usize,
    pub name: String,
    pub start: String,
    pub state_count: usize,
    pub template_count: usize,
}

pub struct MachineManager;

impl MachineManager {
    /// Get the number of available machines
    pub fn get_machine_count() -> usize {
        MACHINES.len()
    }

    /// Get a machine by its index
    pub fn get_machine_by_index(index: usize) -> Result<Machine, MachinationError> {
        MACHINES.get(index).cloned().ok_or_else(|| {
            MachinationError::ValidationError(format!("Machine index {} out of range", index))
        })
    }

    /// Get a machine by its name
    pub fn get_machine_by_name(name: &str) -> Result<Machine, MachinationError> {
        MACHINES
            .iter()
            .find(|machine| machine.display_name() == name)
            .cloned()
            .ok_or_else(|| MachinationError::ValidationError(format!("Machine '{}' not found", name)))
    }

    /// List all machine names
    pub fn list_machine_names() -> Vec<String> {
        MACHINES
            .iter()
            .map(|machine| machine.display_name().to_string())
            .collect()
    }

    /// Get information about a machine by its index
    pub fn get_machine_info(index: usize) -> Result<MachineInfo, MachinationError> {
        let machine = Self::get_machine_by_index(index)?;
        let template_count = machine
            .description
            .states()
            .filter(|state| state.is_template())
            .count();

        Ok(MachineInfo {
            index,
            name: machine.display_name().to_string(),
            start: machine.start.clone(),
            state_count: machine.description.len() - template_count,
            template_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten_machine;
    use crate::types::Symbol;

    #[test]
    fn test_all_bundled_machines_load() {
        assert_eq!(MachineManager::get_machine_count(), MACHINE_TEXTS.len());
    }

    #[test]
    fn test_all_bundled_machines_flatten() {
        for machine in MACHINES.iter() {
            let table = flatten_machine(machine).unwrap();
            assert!(table.contains(&machine.start), "{}", machine.display_name());
        }
    }

    #[test]
    fn test_get_machine_by_name() {
        let machine = MachineManager::get_machine_by_name("Shift right").unwrap();
        assert_eq!(machine.start, "start");

        assert!(MachineManager::get_machine_by_name("Nope").is_err());
    }

    #[test]
    fn test_get_machine_by_index() {
        assert!(MachineManager::get_machine_by_index(0).is_ok());
        assert!(MachineManager::get_machine_by_index(99).is_err());
    }

    #[test]
    fn test_list_machine_names() {
        let names = MachineManager::list_machine_names();
        assert_eq!(
            names,
            vec!["Flip bits", "Binary increment", "Append first symbol", "Shift right"]
        );
    }

    #[test]
    fn test_machine_info() {
        let info = MachineManager::get_machine_info(3).unwrap();
        assert_eq!(info.name, "Shift right");
        assert_eq!(info.state_count, 1);
        assert_eq!(info.template_count, 1);
    }

    #[test]
    fn test_shift_right_instances() {
        let machine = MachineManager::get_machine_by_name("Shift right").unwrap();
        let table = flatten_machine(&machine).unwrap();

        // carry0 reading a 1 writes the 0 it carries and moves on carrying the 1.
        let rule = table.lookup("carry0", Symbol::Char('1')).unwrap();
        assert_eq!(rule.write, Symbol::Char('0'));
        assert_eq!(rule.next_state, "carry1");
        assert!(table.contains("carryEOT"));
    }
}
