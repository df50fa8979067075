use thiserror::Error;

use eventflow_core::{Team, TeamMember, User};

use crate::util::random_code;
use crate::{ClientContext, Gateway, GatewayError, TeamPatch};

pub type Result<T> = std::result::Result<T, TeamError>;

/// Length of generated invite codes
const INVITE_CODE_LENGTH: usize = 6;

/// Teams default to this size unless the event says otherwise
const DEFAULT_MAX_MEMBERS: u32 = 4;

#[derive(Debug, Error)]
pub enum TeamError {
    #[error("sign in to manage teams")]
    NotSignedIn,

    #[error("register for the event before forming a team")]
    NotRegisteredForEvent,

    #[error("no team matches that invite code")]
    InvalidInviteCode,

    #[error("you are already a member of this team")]
    AlreadyMember,

    #[error("this team is full")]
    TeamFull,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Team formation for hackathon-style events.
///
/// Only registered participants can found or join a team; the invite code
/// is the sole credential for joining.
pub struct TeamManager<G> {
    context: ClientContext<G>,
}

impl<G> TeamManager<G>
where
    G: Gateway,
{
    pub fn new(context: &ClientContext<G>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Founds a team for an event, with the signed-in user as its lead.
    /// A custom invite code can be supplied; otherwise one is generated.
    pub async fn create(
        &self,
        name: &str,
        event_id: &str,
        invite_code: Option<String>,
    ) -> Result<Team> {
        let user = self.context.current_user().ok_or(TeamError::NotSignedIn)?;

        self.require_registration(event_id, &user)?;

        let invite_code = invite_code
            .map(|code| code.trim().to_ascii_uppercase())
            .unwrap_or_else(|| random_code(INVITE_CODE_LENGTH));

        let mut team = Team {
            id: String::new(),
            name: name.to_string(),
            event_id: event_id.to_string(),
            members: vec![member(&user, "Team Lead")],
            max_members: DEFAULT_MAX_MEMBERS,
            invite_code,
        };

        team.id = self.context.gateway.create_team(&team).await?;

        let created = team.clone();
        self.context.mirror.mutate_teams(|teams| {
            teams.push(team);
        });

        Ok(created)
    }

    /// Joins the team matching the invite code.
    ///
    /// The checks run in a fixed order, so the caller always learns the
    /// most actionable problem first: a bad code, then a missing
    /// registration, then membership, then capacity.
    pub async fn join(&self, invite_code: &str) -> Result<Team> {
        let user = self.context.current_user().ok_or(TeamError::NotSignedIn)?;

        // Codes are minted uppercase; input is folded to match
        let code = invite_code.trim().to_ascii_uppercase();

        let team = self
            .context
            .mirror
            .team_by_invite_code(&code)
            .ok_or(TeamError::InvalidInviteCode)?;

        self.require_registration(&team.event_id, &user)?;

        if team.is_member(&user.id) {
            return Err(TeamError::AlreadyMember);
        }

        if team.is_full() {
            return Err(TeamError::TeamFull);
        }

        let mut members = team.members.clone();
        members.push(member(&user, "Member"));

        // The full member list is written, not a delta
        let patch = TeamPatch {
            members: Some(members.clone()),
        };

        self.context.gateway.update_team(&team.id, &patch).await?;

        let team_id = team.id.clone();
        self.context.mirror.mutate_teams(|teams| {
            if let Some(team) = teams.iter_mut().find(|t| t.id == team_id) {
                team.members = members.clone();
            }
        });

        let mut joined = team;
        joined.members = patch.members.unwrap_or_default();

        Ok(joined)
    }

    /// The teams the signed-in user belongs to
    pub fn mine(&self) -> Vec<Team> {
        let Some(user) = self.context.current_user() else {
            return Vec::new();
        };

        self.context
            .mirror
            .teams()
            .into_iter()
            .filter(|team| team.is_member(&user.id))
            .collect()
    }

    fn require_registration(&self, event_id: &str, user: &User) -> Result<()> {
        self.context
            .mirror
            .registration_for(event_id, &user.id)
            .map(|_| ())
            .ok_or(TeamError::NotRegisteredForEvent)
    }
}

fn member(user: &User, role: &str) -> TeamMember {
    TeamMember {
        id: user.id.clone(),
        name: user.name.clone(),
        role: role.to_string(),
        email: user.email.clone(),
    }
}
