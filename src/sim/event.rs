/// Events emitted by the session during input handling and ticks.
/// The presentation layer consumes these for sound.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Jumped,
    // Payloads are asserted in tests; sound only needs the kind
    #[allow(dead_code)]
    SpikeHit { col: usize, row: usize, score: i32 },
    #[allow(dead_code)]
    DuckReached { score: i32 },
    SessionReset,
}
