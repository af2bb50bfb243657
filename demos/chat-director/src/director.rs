//! A step handler that issues commands over team chat.

use async_trait::async_trait;
use enginelink::prelude::*;
use enginelink::protocol::RequestAction;

/// Every `interval` steps, orders a squad for each side and sends both
/// toward a random point, then logs whatever the other player said.
pub struct DirectorAgent {
    interval: u32,
    player_id: Option<u32>,
}

impl DirectorAgent {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            player_id: None,
        }
    }
}

/// The chat commands sent at `step`.
pub fn orders(step: u32) -> Vec<Action> {
    let red = format!("red-{step}");
    let blue = format!("blue-{step}");
    [
        format!("cmd-create-siege-tank 3 {red}"),
        format!(
            "cmd-move-toward {red} {} {}",
            rand::random_range(-45..45),
            rand::random_range(0..100) * 2
        ),
        format!("cmd-create-siege-tank 4 {blue}"),
        format!(
            "cmd-move-toward {blue} {} {}",
            rand::random_range(135..225),
            rand::random_range(0..100) * 2
        ),
    ]
    .into_iter()
    .map(|message| Action::chat(ChatChannel::Team, message))
    .collect()
}

#[async_trait]
impl StepHandler for DirectorAgent {
    async fn on_step(&mut self, tick: &mut StepTick<'_>) {
        let step = tick.step();
        if step % self.interval != 0 {
            return;
        }

        let request = RequestAction {
            actions: orders(step),
        };
        if let Err(e) = tick.client().action(request).await {
            tick.abort(e);
            return;
        }

        for chat in tick.chats().drain() {
            tracing::info!(from = chat.player_id, message = %chat.message, "chat received");
        }
    }

    async fn on_match_start(&mut self, player_id: u32) {
        tracing::info!(player_id, "director on the field");
        self.player_id = Some(player_id);
    }

    async fn on_match_end(&mut self, results: &[PlayerResult]) {
        let own = results
            .iter()
            .find(|r| Some(r.player_id) == self.player_id)
            .map(|r| r.result);
        tracing::info!(result = ?own, "match over");
        self.player_id = None;
    }
}
