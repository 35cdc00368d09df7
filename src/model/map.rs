//! Id-indexed arena holding the whole political map.

use std::collections::{BTreeSet, HashMap};

use super::{Cell, Coord, Nation, NationId, Resident, ResidentId, Territory, TerritoryId, Town, TownId};

/// Owned registry of towns, nations, residents, territories and cells.
///
/// The war engine reads relationships from here and mutates occupation
/// through [`capture_territory`](Self::capture_territory),
/// [`release_territory`](Self::release_territory) and the per-cell
/// occupier and attack fields.
#[derive(Debug, Clone, Default)]
pub struct TerritoryMap {
    nations: HashMap<NationId, Nation>,
    towns: HashMap<TownId, Town>,
    residents: HashMap<ResidentId, Resident>,
    territories: HashMap<TerritoryId, Territory>,
    cells: HashMap<Coord, Cell>,
}

impl TerritoryMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Adds or replaces a nation.
    pub fn insert_nation(&mut self, nation: Nation) {
        self.nations.insert(nation.id, nation);
    }

    /// Adds or replaces a town.
    pub fn insert_town(&mut self, town: Town) {
        self.towns.insert(town.id, town);
    }

    /// Adds or replaces a resident.
    pub fn insert_resident(&mut self, resident: Resident) {
        self.residents.insert(resident.id, resident);
    }

    /// Adds a territory and creates a cell for each of its coordinates.
    ///
    /// A coordinate already claimed by another territory is reassigned to
    /// this one. Call [`recompute_adjacency`](Self::recompute_adjacency)
    /// once all territories are in.
    pub fn insert_territory(&mut self, territory: Territory) {
        for coord in &territory.cells {
            if let Some(previous) = self.cells.get(coord).map(|c| c.territory) {
                if previous != territory.id {
                    if let Some(old) = self.territories.get_mut(&previous) {
                        old.cells.remove(coord);
                    }
                }
            }
            self.cells.insert(*coord, Cell::new(*coord, territory.id));
        }
        self.territories.insert(territory.id, territory);
    }

    /// Derives every territory's neighbor set and wilderness flag from
    /// cell adjacency.
    pub fn recompute_adjacency(&mut self) {
        let mut adjacency: HashMap<TerritoryId, (BTreeSet<TerritoryId>, bool)> = HashMap::new();

        for (id, territory) in &self.territories {
            let mut neighbors = BTreeSet::new();
            let mut wilderness = false;
            for coord in &territory.cells {
                for next in coord.neighbors() {
                    match self.cells.get(&next) {
                        Some(cell) if cell.territory != *id => {
                            neighbors.insert(cell.territory);
                        }
                        Some(_) => {}
                        None => wilderness = true,
                    }
                }
            }
            adjacency.insert(*id, (neighbors, wilderness));
        }

        for (id, (neighbors, wilderness)) in adjacency {
            if let Some(territory) = self.territories.get_mut(&id) {
                territory.neighbors = neighbors;
                territory.borders_wilderness = wilderness;
            }
        }
    }

    /// Makes two towns mutual enemies and drops any alliance between them.
    pub fn declare_war(&mut self, a: TownId, b: TownId) {
        if let Some(town) = self.towns.get_mut(&a) {
            town.allies.remove(&b);
            town.enemies.insert(b);
        }
        if let Some(town) = self.towns.get_mut(&b) {
            town.allies.remove(&a);
            town.enemies.insert(a);
        }
    }

    /// Makes two towns mutual allies and drops any war between them.
    pub fn form_alliance(&mut self, a: TownId, b: TownId) {
        if let Some(town) = self.towns.get_mut(&a) {
            town.enemies.remove(&b);
            town.allies.insert(b);
        }
        if let Some(town) = self.towns.get_mut(&b) {
            town.enemies.remove(&a);
            town.allies.insert(a);
        }
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Looks up a nation.
    #[must_use]
    pub fn nation(&self, id: NationId) -> Option<&Nation> {
        self.nations.get(&id)
    }

    /// Looks up a town.
    #[must_use]
    pub fn town(&self, id: TownId) -> Option<&Town> {
        self.towns.get(&id)
    }

    /// Looks up a town for mutation.
    pub fn town_mut(&mut self, id: TownId) -> Option<&mut Town> {
        self.towns.get_mut(&id)
    }

    /// Finds a town by display name.
    #[must_use]
    pub fn town_by_name(&self, name: &str) -> Option<&Town> {
        self.towns.values().find(|t| t.name == name)
    }

    /// Nation of an optional town, `None` if either is missing.
    #[must_use]
    pub fn nation_of(&self, town: Option<TownId>) -> Option<NationId> {
        town.and_then(|id| self.towns.get(&id)).and_then(|t| t.nation)
    }

    /// Looks up a resident.
    #[must_use]
    pub fn resident(&self, id: ResidentId) -> Option<&Resident> {
        self.residents.get(&id)
    }

    /// Looks up a resident for mutation.
    pub fn resident_mut(&mut self, id: ResidentId) -> Option<&mut Resident> {
        self.residents.get_mut(&id)
    }

    /// Looks up a territory.
    #[must_use]
    pub fn territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(&id)
    }

    /// Looks up a territory for mutation.
    pub fn territory_mut(&mut self, id: TerritoryId) -> Option<&mut Territory> {
        self.territories.get_mut(&id)
    }

    /// Looks up a cell.
    #[must_use]
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    /// Looks up a cell for mutation.
    pub fn cell_mut(&mut self, coord: Coord) -> Option<&mut Cell> {
        self.cells.get_mut(&coord)
    }

    /// Looks up a cell together with its territory.
    #[must_use]
    pub fn cell_with_territory(&self, coord: Coord) -> Option<(&Cell, &Territory)> {
        let cell = self.cells.get(&coord)?;
        let territory = self.territories.get(&cell.territory)?;
        Some((cell, territory))
    }

    /// Whether the territory is its owning town's home.
    #[must_use]
    pub fn is_home(&self, territory: &Territory) -> bool {
        territory
            .town
            .and_then(|id| self.towns.get(&id))
            .is_some_and(|town| town.home == Some(territory.id))
    }

    /// Iterates all towns.
    pub fn towns(&self) -> impl Iterator<Item = &Town> {
        self.towns.values()
    }

    /// Iterates all territories.
    pub fn territories(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    /// Iterates all cells.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    // ------------------------------------------------------------------------
    // Occupation
    // ------------------------------------------------------------------------

    /// Puts a territory under occupation by `town`.
    ///
    /// Returns the previous occupier. Ownership is left untouched so the
    /// owner can still liberate it.
    pub fn capture_territory(&mut self, id: TerritoryId, town: TownId) -> Option<TownId> {
        self.territories
            .get_mut(&id)
            .and_then(|territory| territory.occupier.replace(town))
    }

    /// Ends any occupation of a territory, returning the previous occupier.
    pub fn release_territory(&mut self, id: TerritoryId) -> Option<TownId> {
        self.territories
            .get_mut(&id)
            .and_then(|territory| territory.occupier.take())
    }

    /// Town currently controlling a territory: the occupier if any,
    /// otherwise the owner.
    #[must_use]
    pub fn controller(&self, id: TerritoryId) -> Option<TownId> {
        self.territories
            .get(&id)
            .and_then(|territory| territory.occupier.or(territory.town))
    }
}
