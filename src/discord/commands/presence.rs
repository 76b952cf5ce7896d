// Bot presence shown in the member list.

use poise::serenity_prelude as serenity;

/// Called once the bot is ready so members can see how to use it.
pub fn on_ready(ctx: &serenity::Context) {
    let activity = serenity::ActivityData::watching("/quote");
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}
