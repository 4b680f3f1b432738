//! The species table.
//!
//! Rows live in `data/species.ron`, which is embedded at compile time and
//! parsed and validated once on first lookup.

use crate::errors::{SpeciesDataError, SpeciesDataResult};
use schema::{EvolutionStage, SpeciesData};
use std::collections::HashMap;
use std::sync::OnceLock;

const SPECIES_TABLE: &str = include_str!("../data/species.ron");

static SPECIES_DATA: OnceLock<SpeciesDataResult<SpeciesTable>> = OnceLock::new();

/// Parsed and validated species rows, keyed by species name.
#[derive(Debug)]
pub struct SpeciesTable {
    rows: Vec<SpeciesData>,
    by_name: HashMap<String, usize>,
}

impl SpeciesTable {
    /// Parse a RON species table and check that it is internally consistent.
    pub fn parse(text: &str) -> SpeciesDataResult<Self> {
        let rows: Vec<SpeciesData> =
            ron::from_str(text).map_err(|e| SpeciesDataError::Parse(e.to_string()))?;

        let mut by_name = HashMap::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            if by_name.insert(row.name.clone(), index).is_some() {
                return Err(SpeciesDataError::MalformedData(format!(
                    "duplicate species {}",
                    row.name
                )));
            }
        }

        let table = SpeciesTable { rows, by_name };
        for row in &table.rows {
            table.validate_row(row)?;
        }
        Ok(table)
    }

    fn validate_row(&self, row: &SpeciesData) -> SpeciesDataResult<()> {
        if row.max_health == 0 {
            return Err(SpeciesDataError::MalformedData(format!(
                "{} has zero max health",
                row.name
            )));
        }
        if row.moves.is_empty() {
            return Err(SpeciesDataError::MalformedData(format!(
                "{} knows no moves",
                row.name
            )));
        }

        match (&row.evolves_into, row.stage.next()) {
            (None, _) => Ok(()),
            (Some(_), None) => Err(SpeciesDataError::MalformedData(format!(
                "{} is a final stage species but declares an evolution",
                row.name
            ))),
            (Some(next_name), Some(next_stage)) => {
                let next = self.get(next_name).map_err(|_| {
                    SpeciesDataError::MalformedData(format!(
                        "{} evolves into unknown species {}",
                        row.name, next_name
                    ))
                })?;
                if next.stage != next_stage {
                    return Err(SpeciesDataError::MalformedData(format!(
                        "{} ({}) evolves into {} ({}), expected stage {}",
                        row.name, row.stage, next.name, next.stage, next_stage
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> SpeciesDataResult<&SpeciesData> {
        self.by_name
            .get(name)
            .map(|&index| &self.rows[index])
            .ok_or_else(|| SpeciesDataError::SpeciesNotFound(name.to_string()))
    }

    /// All rows in table order.
    pub fn rows(&self) -> &[SpeciesData] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The embedded species table, parsed on first use.
pub fn species_table() -> SpeciesDataResult<&'static SpeciesTable> {
    SPECIES_DATA
        .get_or_init(|| SpeciesTable::parse(SPECIES_TABLE))
        .as_ref()
        .map_err(Clone::clone)
}

/// Look up one species row by name.
pub fn get_species_data(name: &str) -> SpeciesDataResult<&'static SpeciesData> {
    species_table()?.get(name)
}

/// The three Base-stage starters offered to a new player.
pub fn starter_species() -> SpeciesDataResult<Vec<&'static str>> {
    let table = species_table()?;
    Ok(table
        .rows()
        .iter()
        .filter(|row| row.stage == EvolutionStage::Base)
        .take(3)
        .map(|row| row.name.as_str())
        .collect())
}

/// Species that can appear as wild encounters. Only Base-stage species roam.
pub fn wild_species() -> SpeciesDataResult<Vec<&'static str>> {
    let table = species_table()?;
    Ok(table
        .rows()
        .iter()
        .filter(|row| row.stage == EvolutionStage::Base)
        .map(|row| row.name.as_str())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schema::PokemonType;

    #[test]
    fn test_embedded_table_loads() {
        let table = species_table().expect("embedded table must be valid");
        assert_eq!(table.len(), 9);

        let charmander = table.get("Charmander").unwrap();
        assert_eq!(charmander.pokemon_type, PokemonType::Fire);
        assert_eq!(charmander.stage, EvolutionStage::Base);
        assert_eq!(charmander.evolves_into.as_deref(), Some("Charmeleon"));
        assert_eq!(charmander.moves.len(), 4);
    }

    #[test]
    fn test_evolution_chains_are_complete() {
        let table = species_table().unwrap();
        for name in ["Charmander", "Squirtle", "Bulbasaur"] {
            let second = table.get(name).unwrap().evolves_into.clone().unwrap();
            let final_name = table.get(&second).unwrap().evolves_into.clone().unwrap();
            let final_row = table.get(&final_name).unwrap();
            assert_eq!(final_row.stage, EvolutionStage::Final);
            assert!(final_row.evolves_into.is_none());
        }
    }

    #[test]
    fn test_unknown_species() {
        assert_eq!(
            get_species_data("Mewtwo").unwrap_err(),
            SpeciesDataError::SpeciesNotFound("Mewtwo".to_string())
        );
    }

    #[test]
    fn test_starters() {
        let starters = starter_species().unwrap();
        assert_eq!(starters, vec!["Charmander", "Squirtle", "Bulbasaur"]);
        assert_eq!(wild_species().unwrap().len(), 3);
    }

    #[test]
    fn test_rejects_zero_health() {
        let text = r#"[(name: "Broken", pokemon_type: Fire, stage: Base, max_health: 0,
            moves: [(name: "Tackle", damage: 1)])]"#;
        assert!(matches!(
            SpeciesTable::parse(text),
            Err(SpeciesDataError::MalformedData(_))
        ));
    }

    #[test]
    fn test_rejects_moveless_species() {
        let text = r#"[(name: "Mute", pokemon_type: Water, stage: Base, max_health: 10, moves: [])]"#;
        assert!(matches!(
            SpeciesTable::parse(text),
            Err(SpeciesDataError::MalformedData(_))
        ));
    }

    #[test]
    fn test_rejects_dangling_evolution() {
        let text = r#"[(name: "Lonely", pokemon_type: Grass, stage: Base, max_health: 10,
            moves: [(name: "Tackle", damage: 1)], evolves_into: Some("Nobody"))]"#;
        assert!(matches!(
            SpeciesTable::parse(text),
            Err(SpeciesDataError::MalformedData(_))
        ));
    }

    #[test]
    fn test_rejects_stage_skipping_evolution() {
        let text = r#"[
            (name: "Egg", pokemon_type: Fire, stage: Base, max_health: 10,
                moves: [(name: "Tackle", damage: 1)], evolves_into: Some("Dragon")),
            (name: "Dragon", pokemon_type: Fire, stage: Final, max_health: 90,
                moves: [(name: "Inferno", damage: 70)]),
        ]"#;
        assert!(matches!(
            SpeciesTable::parse(text),
            Err(SpeciesDataError::MalformedData(_))
        ));
    }

    #[test]
    fn test_rejects_unparseable_table() {
        assert!(matches!(
            SpeciesTable::parse("not a table"),
            Err(SpeciesDataError::Parse(_))
        ));
    }
}
