//! Headless item session: the player inventory, configured chests, the world
//! drops around them and one drag context.

use anyhow::{anyhow, bail, Result};
use glam::Vec3;
use serde::Serialize;
use std::rc::Rc;
use stowaway_core::{DropId, Item, ItemKey, ItemTypeRegistry, SimTick};
use stowaway_world::{
    ClusterSnapshot, Container, ContainerSnapshot, DragMode, DragOutcome, DragSession,
    DropPool, DropSnapshot, FlatGround, MoveOutcome, PoolStats, SlotPlacement, TracingListener,
    TransferCoordinator, TransferError,
};
use tracing::{debug, info};

use crate::config::{is_inventory_alias, RuntimeConfig};

/// Name the player inventory answers to in commands.
pub const INVENTORY_NAME: &str = "inv";

const INVENTORY: usize = 0;

/// Serializable state dump written by `--snapshot`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub tick: SimTick,
    pub containers: Vec<ContainerSnapshot>,
    pub drops: Vec<DropSnapshot>,
    pub clusters: Vec<ClusterSnapshot>,
    pub pool: PoolStats,
}

pub struct Session {
    registry: ItemTypeRegistry,
    /// Inventory first, then chests in config order.
    containers: Vec<Container>,
    anchors: Vec<Vec3>,
    coordinator: TransferCoordinator,
    drag: DragSession,
    player_position: Vec3,
    pickup_radius: f32,
    tick: SimTick,
}

impl Session {
    pub fn new(config: &RuntimeConfig, registry: ItemTypeRegistry) -> Self {
        let listener = Rc::new(TracingListener);
        let player_position = Vec3::from_array(config.player_position);

        let mut containers = vec![Container::new(INVENTORY_NAME, config.inventory_slots)];
        let mut anchors = vec![player_position];
        for chest in &config.chests {
            containers.push(Container::new(chest.name.clone(), chest.slots));
            anchors.push(Vec3::from_array(chest.position));
        }
        for container in &mut containers {
            container.subscribe(listener.clone());
        }

        let mut coordinator = TransferCoordinator::new(
            config.transfer,
            DropPool::default(),
            Box::new(FlatGround::new(0.0)),
        );
        coordinator.subscribe_pickups(listener);

        info!(
            containers = containers.len(),
            item_types = registry.len(),
            seed = config.transfer.seed,
            "session ready"
        );
        Self {
            registry,
            containers,
            anchors,
            coordinator,
            drag: DragSession::new(),
            player_position,
            pickup_radius: config.pickup_radius,
            tick: SimTick::ZERO,
        }
    }

    pub fn tick(&self) -> SimTick {
        self.tick
    }

    pub fn advance_tick(&mut self) {
        self.tick = self.tick.advance(1);
    }

    pub fn player_position(&self) -> Vec3 {
        self.player_position
    }

    pub fn inventory(&self) -> &Container {
        &self.containers[INVENTORY]
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.container_index(name).ok().map(|index| &self.containers[index])
    }

    pub fn coordinator(&self) -> &TransferCoordinator {
        &self.coordinator
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Create `count` items of `key` in the inventory; overflow lands at the player's feet.
    pub fn give(&mut self, key: &ItemKey, count: u32) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut remaining = count;
        let mut stored = 0;
        while remaining > 0 {
            let item = self.registry.create_item(key, remaining)?;
            let created = item.stack();
            remaining -= created;
            match self.containers[INVENTORY].add_item(item) {
                None => stored += created,
                Some(leftover) => {
                    stored += created - leftover.stack();
                    let amount = leftover.stack();
                    let drop =
                        self.coordinator
                            .drop_detached(leftover, self.player_position, true)?;
                    lines.push(format!("Inventory full, dropped {amount}x {key} as {drop}"));
                }
            }
        }
        lines.insert(0, format!("Gave {stored}x {key}"));
        Ok(lines)
    }

    pub fn drop_from(
        &mut self,
        container: &str,
        slot: usize,
        amount: u32,
        at: Option<Vec3>,
    ) -> Result<Vec<String>> {
        let index = self.container_index(container)?;
        let origin = at.unwrap_or(self.anchors[index]);
        let drop = self.coordinator.drop_item(
            &mut self.containers[index],
            slot,
            amount,
            origin,
            true,
        )?;
        Ok(vec![self.describe_drop(drop)])
    }

    pub fn pickup(&mut self, drop: DropId) -> Result<Vec<String>> {
        let report = self
            .coordinator
            .pickup_item(drop, &mut self.containers[INVENTORY])?;
        let mut line = format!(
            "Picked up {}x {} from {drop}",
            report.absorbed, report.item_type
        );
        if !report.is_complete() {
            line.push_str(&format!(", {} left on the ground", report.remaining));
        }
        Ok(vec![line])
    }

    pub fn pickup_near(&mut self, radius: Option<f32>) -> Result<Vec<String>> {
        let radius = radius.unwrap_or(self.pickup_radius);
        let reports = self.coordinator.pickup_within(
            &mut self.containers[INVENTORY],
            self.player_position,
            radius,
        );
        if reports.is_empty() {
            return Ok(vec![format!("Nothing to pick up within {radius}")]);
        }
        Ok(reports
            .iter()
            .map(|report| {
                format!(
                    "Picked up {}x {} from {} ({} left)",
                    report.absorbed, report.item_type, report.drop, report.remaining
                )
            })
            .collect())
    }

    pub fn move_within(
        &mut self,
        container: &str,
        from: usize,
        to: usize,
        amount: u32,
    ) -> Result<Vec<String>> {
        let index = self.container_index(container)?;
        let outcome = self.containers[index].move_item_to_slot(from, to, amount)?;
        Ok(vec![describe_move(outcome, container, from, container, to)])
    }

    pub fn store(
        &mut self,
        source: &str,
        from: usize,
        target: &str,
        to: usize,
        amount: u32,
    ) -> Result<Vec<String>> {
        let src = self.container_index(source)?;
        let dst = self.container_index(target)?;
        if src == dst {
            return self.move_within(source, from, to, amount);
        }
        let (src_container, dst_container) = pair_mut(&mut self.containers, src, dst);
        let outcome = src_container.move_item_to(dst_container, from, to, amount)?;
        Ok(vec![describe_move(outcome, source, from, target, to)])
    }

    /// Split a stack in place: the half goes to the first free slot, or back if there is none.
    pub fn split(&mut self, container: &str, slot: usize) -> Result<Vec<String>> {
        let index = self.container_index(container)?;
        let half = self.containers[index].split_item(slot)?;
        let Some(free) = self.containers[index].get_available_slot_id() else {
            self.return_to_slot(index, slot, half)?;
            bail!("No free slot in {container} to split into");
        };
        self.place_split(index, slot, free, half)
    }

    /// Put a split-off half into `free`; whatever it does not keep goes back to `slot`.
    fn place_split(
        &mut self,
        index: usize,
        slot: usize,
        free: usize,
        half: Item,
    ) -> Result<Vec<String>> {
        let name = self.containers[index].name().to_string();
        let amount = half.stack();
        match self.containers[index].add_item_to_slot(half, free) {
            SlotPlacement::Placed => Ok(vec![format!(
                "Split {amount} from {name}[{slot}] into {name}[{free}]"
            )]),
            SlotPlacement::Merged { absorbed, leftover } => {
                if let Some(rest) = leftover {
                    self.return_to_slot(index, slot, rest)?;
                }
                Ok(vec![format!(
                    "Split {absorbed} from {name}[{slot}] onto {name}[{free}]"
                )])
            }
            SlotPlacement::Swapped { displaced } => {
                let key = displaced.key().clone();
                self.return_to_slot(index, slot, displaced)?;
                Ok(vec![format!(
                    "Split {amount} from {name}[{slot}] into {name}[{free}], displacing {key}"
                )])
            }
            SlotPlacement::Rejected { item, reason } => {
                self.return_to_slot(index, slot, item)?;
                Err(reason.into())
            }
        }
    }

    /// Restore `item` to `slot`; anything the container cannot hold drops at its anchor.
    fn return_to_slot(&mut self, index: usize, slot: usize, item: Item) -> Result<()> {
        if let Some(lost) = self.containers[index].restore_slot(slot, Some(item)) {
            let drop = self
                .coordinator
                .drop_detached(lost, self.anchors[index], true)?;
            debug!(%drop, slot, "restored item overflowed into the world");
        }
        Ok(())
    }

    pub fn drag(&mut self, container: &str, slot: usize, mode: DragMode) -> Result<Vec<String>> {
        let index = self.container_index(container)?;
        self.drag.begin(&mut self.containers[index], slot, mode)?;
        let line = match self.drag.dragged() {
            Some(dragged) => format!(
                "Dragging {}x {} from {container}[{slot}]",
                dragged.item().stack(),
                dragged.item().key()
            ),
            None => format!("Dragging from {container}[{slot}]"),
        };
        Ok(vec![line])
    }

    pub fn release(&mut self, container: &str, slot: usize) -> Result<Vec<String>> {
        let origin = self.drag_origin()?;
        let target = self.container_index(container)?;
        let outcome = if origin == target {
            self.drag.commit_within(&mut self.containers[target], slot)?
        } else {
            let (source, target) = pair_mut(&mut self.containers, origin, target);
            self.drag.commit_to(source, target, slot)?
        };
        Ok(vec![self.describe_drag(outcome, &format!("{container}[{slot}]"))])
    }

    pub fn release_world(&mut self, at: Option<Vec3>) -> Result<Vec<String>> {
        let origin = self.drag_origin()?;
        let position = at.unwrap_or(self.player_position);
        let outcome = self.drag.commit_to_world(
            &mut self.containers[origin],
            &mut self.coordinator,
            position,
        )?;
        Ok(vec![self.describe_drag(outcome, "the world")])
    }

    pub fn cancel_drag(&mut self) -> Result<Vec<String>> {
        let origin = self.drag_origin()?;
        let outcome = self.drag.cancel(&mut self.containers[origin])?;
        Ok(vec![self.describe_drag(outcome, "its origin")])
    }

    pub fn despawn(&mut self, drop: DropId) -> Result<Vec<String>> {
        let item = self
            .coordinator
            .despawn(drop)
            .ok_or(TransferError::UnknownDrop(drop))?;
        Ok(vec![format!(
            "Despawned {drop} holding {}x {}",
            item.stack(),
            item.key()
        )])
    }

    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Tick {}", self.tick.0)];
        for container in &self.containers {
            lines.push(format!(
                "{} ({}/{} slots)",
                container.name(),
                container.occupied_slots(),
                container.slot_count()
            ));
            for (slot, item) in container.items() {
                lines.push(format!("  [{slot}] {}x {}", item.stack(), item.key()));
            }
        }
        for drop in self.coordinator.pool().active_drops() {
            lines.push(format!("  {}", describe_pool_drop(drop.snapshot())));
        }
        let stats = self.coordinator.pool().stats();
        lines.push(format!(
            "Drops: {} active, {} idle, {} clusters",
            stats.active,
            stats.idle,
            self.coordinator.clusters().len()
        ));
        if let Some(dragged) = self.drag.dragged() {
            lines.push(format!(
                "Dragging {}x {} from slot {}",
                dragged.item().stack(),
                dragged.item().key(),
                dragged.slot()
            ));
        }
        lines
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tick: self.tick,
            containers: self.containers.iter().map(Container::snapshot).collect(),
            drops: self
                .coordinator
                .pool()
                .active_drops()
                .map(|drop| drop.snapshot())
                .collect(),
            clusters: self
                .coordinator
                .clusters()
                .iter()
                .map(|cluster| cluster.snapshot())
                .collect(),
            pool: self.coordinator.pool().stats(),
        }
    }

    fn container_index(&self, name: &str) -> Result<usize> {
        if is_inventory_alias(name) {
            return Ok(INVENTORY);
        }
        self.containers
            .iter()
            .position(|container| container.name() == name)
            .ok_or_else(|| anyhow!("Unknown container: {name}"))
    }

    fn drag_origin(&self) -> Result<usize> {
        let dragged = self.drag.dragged().ok_or(TransferError::NoDragInProgress)?;
        self.containers
            .iter()
            .position(|container| container.id() == dragged.origin())
            .ok_or_else(|| anyhow!("Drag origin {} no longer exists", dragged.origin()))
    }

    fn describe_drop(&self, drop: DropId) -> String {
        match self.coordinator.pool().get_active(drop) {
            Some(entry) => describe_pool_drop(entry.snapshot()),
            None => format!("{drop} is gone"),
        }
    }

    fn describe_drag(&self, outcome: DragOutcome, target: &str) -> String {
        match outcome {
            DragOutcome::Placed => format!("Placed into {target}"),
            DragOutcome::Merged { absorbed } => format!("Merged {absorbed} into {target}"),
            DragOutcome::Swapped => format!("Swapped with {target}"),
            DragOutcome::Restored => "Returned to its slot".to_string(),
            DragOutcome::Rejected { reason } => format!("Rejected ({reason}), returned"),
            DragOutcome::Dropped { drop } => format!("Dropped {}", self.describe_drop(drop)),
            DragOutcome::StillDragging => "No room to return, still dragging".to_string(),
        }
    }
}

fn describe_pool_drop(drop: DropSnapshot) -> String {
    let held = drop
        .item
        .map(|item| format!("{}x {}", item.stack, item.item_type))
        .unwrap_or_else(|| "nothing".to_string());
    let cluster = drop
        .cluster
        .map(|cluster| cluster.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} {held} at ({:.2}, {:.2}, {:.2}) in {cluster}",
        drop.id, drop.position.x, drop.position.y, drop.position.z
    )
}

fn describe_move(outcome: MoveOutcome, source: &str, from: usize, target: &str, to: usize) -> String {
    let route = format!("{source}[{from}] -> {target}[{to}]");
    match outcome {
        MoveOutcome::Unchanged => format!("{route}: same item, nothing to do"),
        MoveOutcome::Relocated => format!("{route}: moved"),
        MoveOutcome::Split { item } => format!("{route}: split off {item}"),
        MoveOutcome::Merged { absorbed } => format!("{route}: merged {absorbed}"),
        MoveOutcome::Swapped => format!("{route}: swapped"),
    }
}

fn pair_mut(
    containers: &mut [Container],
    a: usize,
    b: usize,
) -> (&mut Container, &mut Container) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = containers.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = containers.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{execute_command, parse_command};
    use crate::config::ChestConfig;
    use stowaway_core::ItemType;

    fn key(raw: &str) -> ItemKey {
        ItemKey::parse(raw).unwrap()
    }

    fn session(inventory_slots: usize) -> Session {
        let mut registry = ItemTypeRegistry::new();
        registry.register(ItemType::new(key("wood"), "Wood", 10));
        registry.register(ItemType::new(key("stone"), "Stone", 10));
        let config = RuntimeConfig {
            inventory_slots,
            chests: vec![ChestConfig {
                name: "chest".into(),
                slots: 3,
                position: [4.0, 0.0, 0.0],
            }],
            ..RuntimeConfig::default()
        };
        Session::new(&config, registry)
    }

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        execute_command(session, parse_command(line).unwrap()).lines
    }

    #[test]
    fn test_give_fills_inventory_and_drops_overflow() {
        let mut session = session(2);
        let lines = run(&mut session, "give wood 25");

        assert_eq!(lines[0], "Gave 20x stw:wood");
        assert!(lines[1].starts_with("Inventory full, dropped 5x stw:wood"));
        assert_eq!(session.inventory().count_of(&key("wood")), 20);
        assert_eq!(session.coordinator().pool().stats().active, 1);
    }

    #[test]
    fn test_unknown_item_and_container_report_errors() {
        let mut session = session(4);
        assert!(run(&mut session, "give diamond")[0].starts_with("Error:"));
        assert_eq!(
            run(&mut session, "move barrel 0 1 1"),
            vec!["Error: Unknown container: barrel".to_string()]
        );
    }

    #[test]
    fn test_store_moves_between_inventory_and_chest() {
        let mut session = session(4);
        run(&mut session, "give stone 8");
        let lines = run(&mut session, "store inv 0 chest 2 3");

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("inv[0] -> chest[2]: split off item#"));
        let chest = session.container("chest").unwrap();
        assert_eq!(chest.get_item_in_slot(2).unwrap().stack(), 3);
        assert_eq!(session.inventory().count_of(&key("stone")), 5);
    }

    #[test]
    fn test_drop_and_pickup_round_trip_through_the_world() {
        let mut session = session(4);
        run(&mut session, "give wood 6");
        run(&mut session, "drop inv 0 6 ~ ~ ~");
        assert!(session.inventory().get_item_in_slot(0).is_none());

        let lines = run(&mut session, "pickup-near 5");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Picked up 6x stw:wood"));
        assert_eq!(session.inventory().count_of(&key("wood")), 6);
        assert_eq!(session.coordinator().pool().stats().active, 0);
    }

    #[test]
    fn test_drag_across_containers_and_cancel() {
        let mut session = session(4);
        run(&mut session, "give wood 7");
        run(&mut session, "drag inv 0");
        assert!(session.is_dragging());
        assert_eq!(run(&mut session, "release chest 1"), vec!["Placed into chest[1]"]);
        assert!(!session.is_dragging());
        assert_eq!(session.container("chest").unwrap().count_of(&key("wood")), 7);

        run(&mut session, "drag chest 1 half");
        assert_eq!(
            run(&mut session, "cancel"),
            vec!["Returned to its slot".to_string()]
        );
        assert_eq!(
            session
                .container("chest")
                .unwrap()
                .get_item_in_slot(1)
                .unwrap()
                .stack(),
            7
        );
        assert_eq!(
            run(&mut session, "cancel"),
            vec!["Error: no drag is in progress".to_string()]
        );
    }

    #[test]
    fn test_release_world_turns_drag_into_drop() {
        let mut session = session(4);
        run(&mut session, "give wood 4");
        run(&mut session, "drag inv 0 half");
        let lines = run(&mut session, "release-world 0 3 0");

        assert!(lines[0].starts_with("Dropped drop#"));
        assert_eq!(session.inventory().count_of(&key("wood")), 2);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.drops.len(), 1);
        assert_eq!(snapshot.clusters.len(), 1);
        assert_eq!(snapshot.drops[0].position.y, 0.0);
    }

    #[test]
    fn test_split_uses_free_slot_or_fails_cleanly() {
        let mut session = session(1);
        run(&mut session, "give wood 6");
        let lines = run(&mut session, "split inv 0");
        assert_eq!(lines, vec!["Error: No free slot in inv to split into".to_string()]);
        assert_eq!(
            session.inventory().get_item_in_slot(0).unwrap().stack(),
            6
        );

        let mut session = self::session(3);
        run(&mut session, "give wood 6");
        assert_eq!(
            run(&mut session, "split inv 0"),
            vec!["Split 3 from inv[0] into inv[1]".to_string()]
        );
    }

    #[test]
    fn test_split_onto_occupied_slot_returns_the_rest() {
        let mut session = session(3);
        run(&mut session, "give wood 6");
        let nine = session.registry.create_item(&key("wood"), 9).unwrap();
        assert!(matches!(
            session.containers[INVENTORY].add_item_to_slot(nine, 2),
            SlotPlacement::Placed
        ));

        let half = session.containers[INVENTORY].split_item(0).unwrap();
        let lines = session.place_split(INVENTORY, 0, 2, half).unwrap();
        assert_eq!(lines, vec!["Split 1 from inv[0] onto inv[2]".to_string()]);
        let inventory = session.inventory();
        assert_eq!(inventory.get_item_in_slot(0).unwrap().stack(), 5);
        assert_eq!(inventory.get_item_in_slot(2).unwrap().stack(), 10);
        assert_eq!(inventory.count_of(&key("wood")), 15);
        inventory.check_invariants().unwrap();

        let stone = session.registry.create_item(&key("stone"), 4).unwrap();
        assert!(session.containers[INVENTORY]
            .restore_slot(1, Some(stone))
            .is_none());
        let half = session.containers[INVENTORY].split_item(0).unwrap();
        let lines = session.place_split(INVENTORY, 0, 1, half).unwrap();
        assert_eq!(
            lines,
            vec!["Split 2 from inv[0] into inv[1], displacing stw:stone".to_string()]
        );
        // no room left for the stone, so it lands at the player's feet
        let inventory = session.inventory();
        assert_eq!(inventory.count_of(&key("wood")), 15);
        assert_eq!(inventory.count_of(&key("stone")), 0);
        let drops = session.snapshot().drops;
        assert_eq!(drops.len(), 1);
        let stone = drops[0].item.as_ref().unwrap();
        assert_eq!(stone.item_type, key("stone"));
        assert_eq!(stone.stack, 4);
    }

    #[test]
    fn test_despawn_unknown_drop_is_an_error() {
        let mut session = session(4);
        assert_eq!(
            run(&mut session, "despawn 3"),
            vec!["Error: drop#3 is not an active drop".to_string()]
        );
    }
}
