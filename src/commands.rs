use std::fmt;

use glam::Vec3;
use stowaway_core::{DropId, ItemKey};
use stowaway_world::DragMode;

use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordArg {
    Absolute(f32),
    Relative(f32),
}

impl CoordArg {
    pub fn resolve(self, base: f32) -> f32 {
        match self {
            Self::Absolute(v) => v,
            Self::Relative(delta) => base + delta,
        }
    }
}

/// A world position, optionally relative to the player (`~`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionArg {
    pub x: CoordArg,
    pub y: CoordArg,
    pub z: CoordArg,
}

impl PositionArg {
    pub fn resolve(self, base: Vec3) -> Vec3 {
        Vec3::new(
            self.x.resolve(base.x),
            self.y.resolve(base.y),
            self.z.resolve(base.z),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Help,
    Give {
        item: ItemKey,
        count: u32,
    },
    Drop {
        container: String,
        slot: usize,
        amount: u32,
        at: Option<PositionArg>,
    },
    Pickup {
        drop: DropId,
    },
    PickupNear {
        radius: Option<f32>,
    },
    Move {
        container: String,
        from: usize,
        to: usize,
        amount: u32,
    },
    Store {
        source: String,
        from: usize,
        target: String,
        to: usize,
        amount: u32,
    },
    Split {
        container: String,
        slot: usize,
    },
    Drag {
        container: String,
        slot: usize,
        mode: DragMode,
    },
    Release {
        container: String,
        slot: usize,
    },
    ReleaseWorld {
        at: Option<PositionArg>,
    },
    Cancel,
    Despawn {
        drop: DropId,
    },
    Status,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub lines: Vec<String>,
}

pub fn execute_command(session: &mut Session, cmd: SessionCommand) -> CommandOutput {
    let mut out = CommandOutput::default();
    let result = match cmd {
        SessionCommand::Help => {
            out.lines.extend(help_lines());
            return out;
        }
        SessionCommand::Give { item, count } => session.give(&item, count),
        SessionCommand::Drop {
            container,
            slot,
            amount,
            at,
        } => {
            let at = at.map(|at| at.resolve(session.player_position()));
            session.drop_from(&container, slot, amount, at)
        }
        SessionCommand::Pickup { drop } => session.pickup(drop),
        SessionCommand::PickupNear { radius } => session.pickup_near(radius),
        SessionCommand::Move {
            container,
            from,
            to,
            amount,
        } => session.move_within(&container, from, to, amount),
        SessionCommand::Store {
            source,
            from,
            target,
            to,
            amount,
        } => session.store(&source, from, &target, to, amount),
        SessionCommand::Split { container, slot } => session.split(&container, slot),
        SessionCommand::Drag {
            container,
            slot,
            mode,
        } => session.drag(&container, slot, mode),
        SessionCommand::Release { container, slot } => session.release(&container, slot),
        SessionCommand::ReleaseWorld { at } => {
            let at = at.map(|at| at.resolve(session.player_position()));
            session.release_world(at)
        }
        SessionCommand::Cancel => session.cancel_drag(),
        SessionCommand::Despawn { drop } => session.despawn(drop),
        SessionCommand::Status => Ok(session.status_lines()),
    };
    match result {
        Ok(lines) => out.lines.extend(lines),
        Err(err) => out.lines.push(format!("Error: {err:#}")),
    }
    out
}

pub fn parse_command(input: &str) -> Result<SessionCommand, CommandError> {
    let input = input.trim();
    let input = input.strip_prefix('/').unwrap_or(input).trim();
    if input.is_empty() {
        return Ok(SessionCommand::Help);
    }

    let mut parts = input.split_whitespace();
    let cmd = parts
        .next()
        .ok_or_else(|| CommandError::new("Missing command"))?
        .to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    match cmd.as_str() {
        "help" | "?" => Ok(SessionCommand::Help),
        "give" => {
            if !(1..=2).contains(&args.len()) {
                return Err(CommandError::new("Usage: /give <item> [count]"));
            }
            let item = parse_item(args[0])?;
            let count = if args.len() == 2 {
                parse_positive_u32(args[1]).map_err(|_| CommandError::new("Invalid give count"))?
            } else {
                1
            };
            Ok(SessionCommand::Give { item, count })
        }
        "drop" => {
            if args.len() != 3 && args.len() != 6 {
                return Err(CommandError::new(
                    "Usage: /drop <container> <slot> <amount> [x y z]",
                ));
            }
            Ok(SessionCommand::Drop {
                container: args[0].to_string(),
                slot: parse_slot(args[1])?,
                amount: parse_amount(args[2])?,
                at: parse_optional_position(&args[3..])?,
            })
        }
        "pickup" => {
            if args.len() != 1 {
                return Err(CommandError::new("Usage: /pickup <drop>"));
            }
            Ok(SessionCommand::Pickup {
                drop: parse_drop(args[0])?,
            })
        }
        "pickup-near" => {
            if args.len() > 1 {
                return Err(CommandError::new("Usage: /pickup-near [radius]"));
            }
            let radius = match args.first() {
                Some(raw) => Some(parse_radius(raw)?),
                None => None,
            };
            Ok(SessionCommand::PickupNear { radius })
        }
        "move" => {
            if args.len() != 4 {
                return Err(CommandError::new(
                    "Usage: /move <container> <from> <to> <amount>",
                ));
            }
            Ok(SessionCommand::Move {
                container: args[0].to_string(),
                from: parse_slot(args[1])?,
                to: parse_slot(args[2])?,
                amount: parse_amount(args[3])?,
            })
        }
        "store" => {
            if args.len() != 5 {
                return Err(CommandError::new(
                    "Usage: /store <source> <from> <target> <to> <amount>",
                ));
            }
            Ok(SessionCommand::Store {
                source: args[0].to_string(),
                from: parse_slot(args[1])?,
                target: args[2].to_string(),
                to: parse_slot(args[3])?,
                amount: parse_amount(args[4])?,
            })
        }
        "split" => {
            if args.len() != 2 {
                return Err(CommandError::new("Usage: /split <container> <slot>"));
            }
            Ok(SessionCommand::Split {
                container: args[0].to_string(),
                slot: parse_slot(args[1])?,
            })
        }
        "drag" => {
            if !(2..=3).contains(&args.len()) {
                return Err(CommandError::new("Usage: /drag <container> <slot> [half]"));
            }
            let mode = match args.get(2).map(|raw| raw.to_ascii_lowercase()).as_deref() {
                None | Some("whole") => DragMode::Whole,
                Some("half") => DragMode::Half,
                Some(_) => {
                    return Err(CommandError::new("Usage: /drag <container> <slot> [half]"))
                }
            };
            Ok(SessionCommand::Drag {
                container: args[0].to_string(),
                slot: parse_slot(args[1])?,
                mode,
            })
        }
        "release" => {
            if args.len() != 2 {
                return Err(CommandError::new("Usage: /release <container> <slot>"));
            }
            Ok(SessionCommand::Release {
                container: args[0].to_string(),
                slot: parse_slot(args[1])?,
            })
        }
        "release-world" => {
            if !args.is_empty() && args.len() != 3 {
                return Err(CommandError::new("Usage: /release-world [x y z]"));
            }
            Ok(SessionCommand::ReleaseWorld {
                at: parse_optional_position(&args)?,
            })
        }
        "cancel" => Ok(SessionCommand::Cancel),
        "despawn" => {
            if args.len() != 1 {
                return Err(CommandError::new("Usage: /despawn <drop>"));
            }
            Ok(SessionCommand::Despawn {
                drop: parse_drop(args[0])?,
            })
        }
        "status" | "ls" => Ok(SessionCommand::Status),
        _ => Err(CommandError::new(format!("Unknown command: {cmd}. Try /help"))),
    }
}

fn parse_positive_u32(s: &str) -> Result<u32, ()> {
    let value = s.parse::<u32>().map_err(|_| ())?;
    if value == 0 {
        return Err(());
    }
    Ok(value)
}

fn parse_amount(s: &str) -> Result<u32, CommandError> {
    parse_positive_u32(s).map_err(|_| CommandError::new(format!("Invalid amount: {s}")))
}

fn parse_slot(s: &str) -> Result<usize, CommandError> {
    s.parse::<usize>()
        .map_err(|_| CommandError::new(format!("Invalid slot: {s}")))
}

fn parse_radius(s: &str) -> Result<f32, CommandError> {
    match s.parse::<f32>() {
        Ok(radius) if radius.is_finite() && radius >= 0.0 => Ok(radius),
        _ => Err(CommandError::new(format!("Invalid radius: {s}"))),
    }
}

fn parse_drop(s: &str) -> Result<DropId, CommandError> {
    let raw = s.strip_prefix("drop#").unwrap_or(s);
    raw.parse::<u32>()
        .map(DropId)
        .map_err(|_| CommandError::new(format!("Invalid drop id: {s}")))
}

fn parse_item(token: &str) -> Result<ItemKey, CommandError> {
    ItemKey::parse(token).map_err(|err| CommandError::new(format!("Invalid item: {err}")))
}

fn parse_optional_position(args: &[&str]) -> Result<Option<PositionArg>, CommandError> {
    match args {
        [] => Ok(None),
        [x, y, z] => Ok(Some(PositionArg {
            x: parse_coord(x)?,
            y: parse_coord(y)?,
            z: parse_coord(z)?,
        })),
        _ => Err(CommandError::new("Expected a position: <x> <y> <z>")),
    }
}

fn parse_coord(s: &str) -> Result<CoordArg, CommandError> {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix('~') {
        if rest.is_empty() {
            return Ok(CoordArg::Relative(0.0));
        }
        return match rest.parse::<f32>() {
            Ok(delta) if delta.is_finite() => Ok(CoordArg::Relative(delta)),
            _ => Err(CommandError::new(format!("Invalid relative coordinate: {s}"))),
        };
    }
    match s.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(CoordArg::Absolute(value)),
        _ => Err(CommandError::new(format!("Invalid coordinate: {s}"))),
    }
}

fn help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "/give <item> [count]".to_string(),
        "/drop <container> <slot> <amount> [x y z]".to_string(),
        "/pickup <drop> | /pickup-near [radius]".to_string(),
        "/move <container> <from> <to> <amount>".to_string(),
        "/store <source> <from> <target> <to> <amount>".to_string(),
        "/split <container> <slot>".to_string(),
        "/drag <container> <slot> [half] then /release <container> <slot>, /release-world [x y z] or /cancel".to_string(),
        "/despawn <drop>".to_string(),
        "/status".to_string(),
        "Containers: inv, or a chest name from the runtime config. Coordinates accept ~ for player-relative.".to_string(),
    ]
}
