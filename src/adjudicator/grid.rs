//! Simultaneous-move grid game arbiter (two snakes on a bounded grid).
//!
//! Unlike the board game there is no turn order: both players move every
//! tick, so a candidate only needs one of the two signatures, while the
//! previous state used as proof needs both (each side vouches for the common
//! starting point). The per-channel rules live in an immutable, co-signed
//! [GridConfig] that is always supplied as `proofs[0]`.

use serde::{Deserialize, Serialize};

use super::{payout, Adjudicator, AdjudicatorError, Outcome, POOL};
use crate::channel::{Channel, State, GUEST, HOST};
use crate::codec::{self, types::Signature};
use crate::sig;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridConfig {
    pub grid_size: i32,
    pub init_snake_len: u32,
    pub food_count: u32,
}

/// Channel rules co-signed by both participants, host signature first.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct SignedGridConfig {
    pub config: GridConfig,
    pub sigs: [Signature; 2],
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    /// Occupied cells, head first.
    pub body: Vec<Point>,
    pub direction: Direction,
    pub dead: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    pub version: u64,
    pub grid_size: i32,
    pub snakes: [Snake; 2],
    pub food: Vec<Point>,
    pub tick: u64,
    /// 0 = undecided, 1 = host, 2 = guest. Trusted verbatim from the signed
    /// candidate; the physics step does not derive it (reference gap, kept).
    pub winner: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignedGridState {
    pub state: GridState,
    pub sigs: Vec<Signature>,
}

/// The playable interior excludes a one-cell boundary on every side.
fn in_interior(p: Point, grid_size: i32) -> bool {
    p.x >= 1 && p.x < grid_size - 1 && p.y >= 1 && p.y < grid_size - 1
}

/// Deterministic physics for one tick.
///
/// The previous state is deep-copied and mutated, never aliased. For every
/// snake that entered the tick alive: the head advances along the snake's
/// direction, a boundary hit kills it, eating food grows it by keeping the
/// tail, otherwise the whole body shifts toward the head. Once both snakes
/// have moved, every new head is checked against every *other*
/// alive-before-the-tick snake's updated body; a hit kills the head's owner,
/// so head-to-head collisions kill both. The food list is inherited
/// unchanged; nothing here places new food (reference gap, kept).
pub fn step(prev: &GridState) -> GridState {
    let mut next = prev.clone();
    next.tick = prev.tick + 1;

    let alive_before = [!prev.snakes[0].dead, !prev.snakes[1].dead];

    for i in 0..2 {
        if !alive_before[i] {
            continue;
        }
        let snake = &mut next.snakes[i];
        let head = match snake.body.first() {
            Some(head) => *head,
            None => {
                snake.dead = true;
                continue;
            }
        };
        let (dx, dy) = snake.direction.delta();
        let new_head = Point {
            x: head.x + dx,
            y: head.y + dy,
        };
        if !in_interior(new_head, prev.grid_size) {
            snake.dead = true;
        }
        snake.body.insert(0, new_head);
        if !prev.food.contains(&new_head) {
            snake.body.pop();
        }
    }

    // Collision pass over the updated bodies.
    let moved = next.snakes.clone();
    for i in 0..2 {
        if !alive_before[i] {
            continue;
        }
        let head = match moved[i].body.first() {
            Some(head) => *head,
            None => continue,
        };
        for j in 0..2 {
            if j == i || !alive_before[j] {
                continue;
            }
            if moved[j].body.contains(&head) {
                next.snakes[i].dead = true;
            }
        }
    }

    next
}

fn verified_config(
    channel: &Channel,
    proof: &State,
) -> Result<GridConfig, AdjudicatorError> {
    let signed: SignedGridConfig = proof.decode_data()?;
    let hash = codec::to_hash(&signed.config)?;
    for (idx, signature) in signed.sigs.iter().enumerate() {
        let signer = sig::recover_signer(hash, *signature)
            .map_err(|_| AdjudicatorError::InvalidConfigSignatures)?;
        if signer != channel.participants[idx] {
            return Err(AdjudicatorError::InvalidConfigSignatures);
        }
    }
    Ok(signed.config)
}

fn verified_previous(
    channel: &Channel,
    proof: &State,
) -> Result<GridState, AdjudicatorError> {
    let signed: SignedGridState = proof.decode_data()?;
    let hash = codec::to_hash(&signed.state)?;
    let mut covered = [false; 2];
    for signature in &signed.sigs {
        if let Ok(signer) = sig::recover_signer(hash, *signature) {
            if let Some(idx) = channel.part_idx(signer) {
                covered[idx] = true;
            }
        }
    }
    if !(covered[HOST] && covered[GUEST]) {
        return Err(AdjudicatorError::InvalidPreviousStateSignatures);
    }
    Ok(signed.state)
}

fn validate_initial(config: &GridConfig, state: &GridState) -> Result<(), AdjudicatorError> {
    if state.grid_size != config.grid_size || state.food.len() != config.food_count as usize {
        return Err(AdjudicatorError::InvalidGameState);
    }
    for snake in &state.snakes {
        if snake.dead
            || snake.body.len() != config.init_snake_len as usize
            || !snake.body.iter().all(|p| in_interior(*p, state.grid_size))
        {
            return Err(AdjudicatorError::InvalidGameState);
        }
    }
    let [a, b] = &state.snakes;
    if a.body.iter().any(|p| b.body.contains(p)) {
        return Err(AdjudicatorError::InvalidGameState);
    }
    for food in &state.food {
        if !in_interior(*food, state.grid_size)
            || state.snakes.iter().any(|s| s.body.contains(food))
        {
            return Err(AdjudicatorError::InvalidGameState);
        }
    }
    Ok(())
}

fn validate_transition(prev: &GridState, cand: &GridState) -> Result<(), AdjudicatorError> {
    // A decided game accepts no further ticks.
    if prev.winner != 0 {
        return Err(AdjudicatorError::InvalidGameState);
    }
    if cand.tick != prev.tick + 1 {
        return Err(AdjudicatorError::InvalidTick);
    }
    if cand.grid_size != prev.grid_size || cand.food.len() != prev.food.len() {
        return Err(AdjudicatorError::InvalidGameState);
    }

    // Replay the tick and compare. Directions are the players' fresh inputs
    // for the next tick and the winner is trusted verbatim, so neither is
    // part of the comparison.
    let expected = step(prev);
    for (exp, got) in expected.snakes.iter().zip(cand.snakes.iter()) {
        if exp.body != got.body || exp.dead != got.dead {
            return Err(AdjudicatorError::InvalidGameState);
        }
    }
    if expected.food != cand.food {
        return Err(AdjudicatorError::InvalidGameState);
    }
    Ok(())
}

pub struct GridGame;

impl Adjudicator for GridGame {
    fn adjudicate(
        &self,
        channel: &Channel,
        candidate: &State,
        proofs: &[State],
    ) -> Result<Outcome, AdjudicatorError> {
        let signed: SignedGridState = candidate.decode_data()?;

        let hash = codec::to_hash(&signed.state)?;
        let any_participant = signed.sigs.iter().any(|signature| {
            sig::recover_signer(hash, *signature)
                .ok()
                .and_then(|signer| channel.part_idx(signer))
                .is_some()
        });
        if !any_participant {
            return Err(AdjudicatorError::InvalidSignature);
        }

        match proofs {
            [config_proof] => {
                let config = verified_config(channel, config_proof)?;
                validate_initial(&config, &signed.state)?;
            }
            [config_proof, prev_proof] => {
                verified_config(channel, config_proof)?;
                let prev = verified_previous(channel, prev_proof)?;
                validate_transition(&prev, &signed.state)?;
            }
            _ => return Err(AdjudicatorError::InvalidProofCount),
        }

        Ok(match signed.state.winner {
            1 => payout(candidate, POOL.into(), 0.into()),
            2 => payout(candidate, 0.into(), POOL.into()),
            _ => payout(candidate, (POOL / 2).into(), (POOL / 2).into()),
        })
    }
}
