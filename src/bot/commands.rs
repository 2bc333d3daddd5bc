//! Slash commands understood by the bot.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "welcome message")]
    Start,
    #[command(description = "show this message")]
    Help,
    #[command(description = "view your registered in-game name and ID")]
    MyInfo,
    #[command(description = "join an open tournament")]
    Register,
    #[command(description = "list the tournaments you joined")]
    MyTournaments,
    #[command(description = "leave a tournament: /unregister <id>")]
    Unregister(String),
    #[command(description = "abort the current registration")]
    Cancel,
}

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Admin commands:")]
pub enum AdminCommand {
    #[command(description = "show admin commands")]
    Admin,
    #[command(description = "list all tournaments with sign-up counts")]
    Tournaments,
    #[command(description = "create: /addtournament <BR|CS> | <date and time> | <fee> [| <capacity>]")]
    AddTournament(String),
    #[command(description = "show players: /registrations <id>")]
    Registrations(String),
    #[command(description = "message every user: /broadcast <text>")]
    Broadcast(String),
    #[command(description = "store room credentials: /setroom <id> <room id> <password>")]
    SetRoom(String),
    #[command(description = "send room credentials to registrants: /sendroom <id>")]
    SendRoom(String),
    #[command(description = "remove a player: /kick <id> <game id>")]
    Kick(String),
    #[command(description = "delete a tournament and its registrations: /deletetournament <id>")]
    DeleteTournament(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: &str = "tourney_bot";

    #[test]
    fn test_parses_user_commands() {
        assert_eq!(Command::parse("/myinfo", BOT).unwrap(), Command::MyInfo);
        assert_eq!(Command::parse("/register", BOT).unwrap(), Command::Register);
        assert_eq!(
            Command::parse("/unregister 12", BOT).unwrap(),
            Command::Unregister("12".to_string())
        );
        assert_eq!(Command::parse("/start@tourney_bot", BOT).unwrap(), Command::Start);
    }

    #[test]
    fn test_parses_admin_commands() {
        assert_eq!(
            AdminCommand::parse("/addtournament CS | May 25, 8:00 PM | 50", BOT).unwrap(),
            AdminCommand::AddTournament("CS | May 25, 8:00 PM | 50".to_string())
        );
        assert_eq!(
            AdminCommand::parse("/kick 3 123456789", BOT).unwrap(),
            AdminCommand::Kick("3 123456789".to_string())
        );
    }

    #[test]
    fn test_command_sets_are_disjoint() {
        assert!(Command::parse("/broadcast hi", BOT).is_err());
        assert!(AdminCommand::parse("/register", BOT).is_err());
    }

    #[test]
    fn test_help_lists_commands() {
        let help = Command::descriptions().to_string();
        assert!(help.contains("/register"));
        assert!(help.contains("/myinfo"));
        assert!(!help.contains("/broadcast"));
    }
}
