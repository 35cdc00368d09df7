//! Attack eligibility predicates.
//!
//! Pure functions over the town/nation/ally/enemy/occupier graph. They
//! never mutate the map; [`FlagWar`](super::FlagWar) runs them in a fixed
//! order inside `begin_attack`.

use crate::model::{Cell, TerritoryMap, Territory, Town};

/// Whether a territory sits on its town's border.
///
/// A town's home is never a border territory. Otherwise the territory
/// qualifies if it touches wilderness or any neighbor belongs to a
/// different town.
#[must_use]
pub fn is_border_territory(map: &TerritoryMap, territory: &Territory) -> bool {
    if map.is_home(territory) {
        return false;
    }

    if territory.borders_wilderness {
        return true;
    }

    territory
        .neighbors
        .iter()
        .filter_map(|id| map.territory(*id))
        .any(|neighbor| neighbor.town != territory.town)
}

/// Whether attacking this cell would be redundant.
///
/// True when the territory is occupied by the attacker or an ally and the
/// cell is not held by an enemy, or when the cell itself is held by the
/// attacker or an ally.
#[must_use]
pub fn chunk_already_captured(cell: &Cell, territory: &Territory, attacking: &Town) -> bool {
    if attacking.is_self_or_ally(territory.occupier) && !attacking.is_enemy(cell.occupier) {
        return true;
    }

    attacking.is_self_or_ally(cell.occupier)
}

/// Whether the cell is hostile ground for the attacking town.
///
/// Occupation nests, so three shapes count:
/// 1. the territory belongs to an enemy;
/// 2. the territory belongs to the attacker, its nation or an ally, and
///    either the territory or the cell is held by an enemy;
/// 3. the territory is occupied by the attacker, its nation or an ally,
///    and the cell is held by an enemy.
#[must_use]
pub fn chunk_is_enemy(map: &TerritoryMap, cell: &Cell, territory: &Territory, attacking: &Town) -> bool {
    if attacking.is_enemy(territory.town) {
        return true;
    }

    let attacking_nation = attacking.nation;

    let friendly_owner = territory.town == Some(attacking.id)
        || (attacking_nation.is_some() && attacking_nation == map.nation_of(territory.town))
        || attacking.is_ally(territory.town);

    if friendly_owner
        && (attacking.is_enemy(territory.occupier) || attacking.is_enemy(cell.occupier))
    {
        return true;
    }

    let friendly_occupier = territory.occupier == Some(attacking.id)
        || (attacking_nation.is_some() && attacking_nation == map.nation_of(territory.occupier))
        || attacking.is_ally(territory.occupier);

    friendly_occupier && attacking.is_enemy(cell.occupier)
}

/// Whether an attack may be launched across the edge shared with
/// `neighbor`.
///
/// Open edges are wilderness (no cell), unclaimed territory, and any cell
/// the attacker's side already controls: own territory with no or an
/// allied occupier, territory or cell held by the attacker or an ally,
/// and the nation-level versions of those checks.
#[must_use]
pub fn can_attack_from_neighbor(map: &TerritoryMap, neighbor: Option<&Cell>, attacking: &Town) -> bool {
    let Some(neighbor) = neighbor else {
        return true;
    };

    let Some(territory) = map.territory(neighbor.territory) else {
        return true;
    };

    let Some(neighbor_town) = territory.town else {
        return true;
    };

    let territory_occupier = territory.occupier;
    let cell_occupier = neighbor.occupier;

    if neighbor_town == attacking.id
        && (territory_occupier.is_none() || attacking.is_ally(territory_occupier))
    {
        return true;
    }

    if attacking.is_self_or_ally(territory_occupier) {
        return true;
    }

    if attacking.is_self_or_ally(cell_occupier) {
        return true;
    }

    let Some(attacking_nation) = attacking.nation else {
        return false;
    };

    let neighbor_nation = map.nation_of(Some(neighbor_town));
    let territory_occupier_nation = map.nation_of(territory_occupier);
    let cell_occupier_nation = map.nation_of(cell_occupier);

    // own territory held by a town of the same nation as the owner
    if neighbor_town == attacking.id && neighbor_nation == territory_occupier_nation {
        return true;
    }

    if Some(attacking_nation) == neighbor_nation
        && (territory_occupier.is_none() || attacking.is_ally(territory_occupier))
    {
        return true;
    }

    Some(attacking_nation) == territory_occupier_nation || Some(attacking_nation) == cell_occupier_nation
}

/// Whether any orthogonal neighbor of the cell opens an attack edge.
#[must_use]
pub fn chunk_is_at_edge(map: &TerritoryMap, cell: &Cell, attacking: &Town) -> bool {
    cell.coord
        .neighbors()
        .into_iter()
        .any(|coord| can_attack_from_neighbor(map, map.cell(coord), attacking))
}
