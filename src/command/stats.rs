use crate::db::MemberRecord;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn stats(
    ctx: Context<'_>,
    #[description = "Member to show activity for (leave empty for yourself)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;
    let user = user.as_ref().unwrap_or_else(|| ctx.author());

    let record = ctx
        .data()
        .presence
        .store()
        .find(&guild_id.to_string(), &user.id.to_string())
        .await?;

    match record {
        Some(record) => {
            ctx.say(format_stats(&record)).await?;
        }
        None => {
            ctx.say(format!("No activity recorded for **{}** yet.", user.name)).await?;
        }
    }

    Ok(())
}

fn format_stats(record: &MemberRecord) -> String {
    let joined = record.joined();
    let mut lines = vec![
        format!("**Activity of {}**", record.username),
        format!(
            "- First seen: {} at {}",
            joined.date.format("%d/%m/%Y"),
            joined.time.format("%H:%M:%S")
        ),
        format!(
            "- Voice: {} connections, {} disconnections",
            record.connection_count(),
            record.disconnection_count()
        ),
        format!(
            "- AFK: {} entrances, {} exits",
            record.afk_entrance_count(),
            record.afk_exit_count()
        ),
        format!("- Messages: {}", record.message_count()),
        record.total_connected_duration(),
    ];

    if let Some(afk) = record.total_afk_time() {
        lines.push(format!("Time spent AFK: {}", afk));
    }

    lines.join("\n")
}
