/// A world coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Object kinds as the runner encodes them in state tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Player,
    Food,
    Wormhole,
    GasCloud,
    AsteroidField,
    TorpedoSalvo,
    Superfood,
}

impl ObjectType {
    /// Maps a wire type code. Codes outside the known set decode to `None`
    /// and the whole snapshot is rejected upstream.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ObjectType::Player),
            2 => Some(ObjectType::Food),
            3 => Some(ObjectType::Wormhole),
            4 => Some(ObjectType::GasCloud),
            5 => Some(ObjectType::AsteroidField),
            6 => Some(ObjectType::TorpedoSalvo),
            7 => Some(ObjectType::Superfood),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ObjectType::Player => 1,
            ObjectType::Food => 2,
            ObjectType::Wormhole => 3,
            ObjectType::GasCloud => 4,
            ObjectType::AsteroidField => 5,
            ObjectType::TorpedoSalvo => 6,
            ObjectType::Superfood => 7,
        }
    }
}

/// One object in the world, our own ship included. Ids are unique within a
/// snapshot; headings are degrees in `[0, 360)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObject {
    pub id: String,
    pub size: i32,
    pub speed: i32,
    pub current_heading: i32,
    pub position: Position,
    pub object_type: ObjectType,
}
