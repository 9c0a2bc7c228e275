/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::Arc;
use std::time::Duration;

use log::*;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::MixPoolManager;

///Run `cleanup_expired_pools` every `period` until the returned task is aborted.
///
///Must be called from within a tokio runtime.
pub fn spawn_cleanup_task(manager: Arc<MixPoolManager>, period: Duration) -> JoinHandle<()> {
    let period = period.max(Duration::from_millis(1));
    info!("Starting pool cleanup every {period:?}");
    return tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let expired = manager.cleanup_expired_pools();
            trace!("Cleanup tick, {expired} pool(s) expired");
        }
    })
}
