//! Capacity allocator. Chooses the rooms that seat an exam.
//!
//! Automatic mode is a contiguous-window search over the catalog sorted by capacity
//! (descending, room id ascending). Each start index accumulates rooms in order until the
//! running total covers the demand; the winning window minimises excess, then room count,
//! then start index. It is bounded (O(n²)) and deterministic, and can miss a
//! non-contiguous combination with lower excess.
//!
//! Pure functions; no I/O.

use super::entities::{AllocationMode, AllocationRequest, AllocationResult, Room, RoomId};
use super::errors::DomainError;
use std::collections::{BTreeSet, HashSet};

/// Allocate rooms for `request` from `catalog`.
pub fn allocate(
    request: &AllocationRequest,
    catalog: &[Room],
) -> Result<AllocationResult, DomainError> {
    match request.mode {
        AllocationMode::Automatic => allocate_automatic(request.required_seats, catalog),
        AllocationMode::Manual => {
            allocate_manual(request.required_seats, catalog, &request.manual_room_ids)
        }
    }
}

/// Catalog in allocation order: capacity descending, id ascending. Duplicate ids keep
/// their first catalog occurrence.
pub fn sorted_by_capacity(catalog: &[Room]) -> Vec<&Room> {
    let mut seen = HashSet::with_capacity(catalog.len());
    let mut rooms: Vec<&Room> = catalog.iter().filter(|r| seen.insert(&r.id)).collect();
    rooms.sort_by(|a, b| b.capacity.cmp(&a.capacity).then_with(|| a.id.cmp(&b.id)));
    rooms
}

/// One start index that reached the target.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: usize,
    len: usize,
    total: u32,
    excess: u32,
}

pub fn allocate_automatic(
    required_seats: u32,
    catalog: &[Room],
) -> Result<AllocationResult, DomainError> {
    let sorted = sorted_by_capacity(catalog);
    let mut windows = Vec::new();

    for start in 0..sorted.len() {
        let mut total: u32 = 0;
        let mut reached = false;
        for (offset, room) in sorted[start..].iter().enumerate() {
            total = total.saturating_add(room.capacity);
            if total >= required_seats {
                windows.push(Window {
                    start,
                    len: offset + 1,
                    total,
                    excess: total - required_seats,
                });
                reached = true;
                break;
            }
        }
        // Suffix sums only shrink: later starts cannot reach the target either.
        if !reached {
            break;
        }
    }

    let best = windows
        .into_iter()
        .min_by_key(|w| (w.excess, w.len, w.start))
        .ok_or_else(|| DomainError::InsufficientCapacity {
            required: required_seats,
            available: total_capacity(sorted.iter().copied()),
        })?;

    let rooms: Vec<Room> = sorted[best.start..best.start + best.len]
        .iter()
        .map(|r| (*r).clone())
        .collect();

    Ok(AllocationResult {
        rooms,
        total_capacity: best.total,
        excess: best.excess,
    })
}

/// Resolve a user-chosen room set against the catalog. Ids missing from the catalog are
/// dropped; an empty effective set is `EmptySelection`. Rooms come back in allocation order.
pub fn allocate_manual(
    required_seats: u32,
    catalog: &[Room],
    room_ids: &BTreeSet<RoomId>,
) -> Result<AllocationResult, DomainError> {
    let rooms: Vec<Room> = sorted_by_capacity(catalog)
        .into_iter()
        .filter(|r| room_ids.contains(&r.id))
        .cloned()
        .collect();

    if rooms.is_empty() {
        return Err(DomainError::EmptySelection);
    }

    let total = total_capacity(rooms.iter());
    if total < required_seats {
        return Err(DomainError::InsufficientCapacity {
            required: required_seats,
            available: total,
        });
    }

    Ok(AllocationResult {
        rooms,
        total_capacity: total,
        excess: total - required_seats,
    })
}

fn total_capacity<'a>(rooms: impl Iterator<Item = &'a Room>) -> u32 {
    rooms.fold(0u32, |acc, r| acc.saturating_add(r.capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoomType;

    fn rooms(caps: &[(&str, u32)]) -> Vec<Room> {
        caps.iter()
            .map(|(id, cap)| Room::new(*id, format!("Salle {}", id), *cap, RoomType::ClassRoom))
            .collect()
    }

    fn five_rooms() -> Vec<Room> {
        // Deliberately unsorted input.
        rooms(&[("r3", 30), ("r1", 50), ("r5", 10), ("r2", 40), ("r4", 20)])
    }

    fn capacities(result: &AllocationResult) -> Vec<u32> {
        result.rooms.iter().map(|r| r.capacity).collect()
    }

    #[test]
    fn tie_on_excess_prefers_fewer_rooms() {
        let result = allocate_automatic(75, &five_rooms()).unwrap();
        assert_eq!(capacities(&result), vec![50, 40]);
        assert_eq!(result.total_capacity, 90);
        assert_eq!(result.excess, 15);
    }

    #[test]
    fn keeps_window_result_over_non_contiguous_optimum() {
        // {50,30,20} would also give excess 5 with fewer rooms, but is not a window.
        let result = allocate_automatic(95, &five_rooms()).unwrap();
        assert_eq!(capacities(&result), vec![40, 30, 20, 10]);
        assert_eq!(result.total_capacity, 100);
        assert_eq!(result.excess, 5);
    }

    #[test]
    fn insufficient_capacity_reports_catalog_total() {
        let err = allocate_automatic(60, &rooms(&[("a", 30), ("b", 20)])).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientCapacity {
                required: 60,
                available: 50
            }
        );
    }

    #[test]
    fn exact_fit_has_zero_excess() {
        let result = allocate_automatic(30, &five_rooms()).unwrap();
        assert_eq!(capacities(&result), vec![30]);
        assert_eq!(result.excess, 0);
    }

    #[test]
    fn equal_capacities_break_ties_by_room_id() {
        let catalog = rooms(&[("12", 40), ("3", 40), ("7", 40)]);
        let result = allocate_automatic(35, &catalog).unwrap();
        assert_eq!(result.room_ids(), vec![RoomId::from("3")]);

        let sorted: Vec<&str> = sorted_by_capacity(&catalog)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(sorted, vec!["3", "7", "12"]);
    }

    #[test]
    fn full_tie_prefers_smallest_start_index() {
        // Windows from start 0 ({40}) and start 1 ({40}) tie on excess and size.
        let catalog = rooms(&[("a", 40), ("b", 40)]);
        let result = allocate_automatic(40, &catalog).unwrap();
        assert_eq!(result.room_ids(), vec![RoomId::from("a")]);
    }

    #[test]
    fn zero_seats_picks_smallest_room() {
        let result = allocate_automatic(0, &five_rooms()).unwrap();
        assert_eq!(capacities(&result), vec![10]);
        assert_eq!(result.excess, 10);
    }

    #[test]
    fn empty_catalog_is_insufficient() {
        let err = allocate_automatic(0, &[]).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientCapacity { .. }));
    }

    #[test]
    fn duplicate_ids_are_counted_once() {
        let catalog = rooms(&[("a", 30), ("a", 30), ("b", 10)]);
        let err = allocate_automatic(50, &catalog).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientCapacity {
                required: 50,
                available: 40
            }
        );
    }

    #[test]
    fn covers_demand_whenever_catalog_can() {
        let catalog = five_rooms();
        for required in 0..=150 {
            let result = allocate_automatic(required, &catalog).unwrap();
            assert!(result.total_capacity >= required);
            assert_eq!(result.excess, result.total_capacity - required);
            let unique: HashSet<_> = result.rooms.iter().map(|r| &r.id).collect();
            assert_eq!(unique.len(), result.rooms.len());
        }
        for required in 151..160 {
            assert!(matches!(
                allocate_automatic(required, &catalog),
                Err(DomainError::InsufficientCapacity { .. })
            ));
        }
    }

    #[test]
    fn is_deterministic_across_input_orderings() {
        let a = five_rooms();
        let mut b = a.clone();
        b.reverse();
        for required in [1, 45, 75, 95, 120] {
            assert_eq!(
                allocate_automatic(required, &a).unwrap(),
                allocate_automatic(required, &b).unwrap()
            );
        }
    }

    #[test]
    fn manual_empty_selection_fails_regardless_of_seats() {
        for seats in [0, 10, 1000] {
            let req = AllocationRequest::manual(seats, Vec::new());
            assert_eq!(allocate(&req, &five_rooms()), Err(DomainError::EmptySelection));
        }
    }

    #[test]
    fn manual_unknown_ids_resolve_to_empty_selection() {
        let catalog = rooms(&[("r1", 50), ("r2", 40)]);
        let req = AllocationRequest::manual(10, [RoomId::from("r3")]);
        assert_eq!(allocate(&req, &catalog), Err(DomainError::EmptySelection));
    }

    #[test]
    fn manual_selection_is_resolved_in_allocation_order() {
        let req = AllocationRequest::manual(55, [RoomId::from("r5"), RoomId::from("r1")]);
        let result = allocate(&req, &five_rooms()).unwrap();
        assert_eq!(capacities(&result), vec![50, 10]);
        assert_eq!(result.total_capacity, 60);
        assert_eq!(result.excess, 5);
    }

    #[test]
    fn manual_selection_below_demand_is_insufficient() {
        let req = AllocationRequest::manual(80, [RoomId::from("r5"), RoomId::from("r1")]);
        assert_eq!(
            allocate(&req, &five_rooms()),
            Err(DomainError::InsufficientCapacity {
                required: 80,
                available: 60
            })
        );
    }
}
