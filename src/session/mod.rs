//! Session - state machine, participant roster and shared document
//!
//! A `Session` is plain data plus the rules that mutate it. It does no
//! locking, broadcasting or recording itself; the registry wraps each one in
//! its own mutex and performs side effects after a mutation succeeds.

use chrono::{DateTime, Duration, Utc};

use crate::document::{apply_operation, fold_changes};
use crate::error::{CollabError, CollabResult};
use crate::types::{
    color_for_index, Change, EndReason, Operation, Participant, ParticipantRole,
    PublicSessionSummary, SessionInfo, SessionStatus,
};

/// Deterministic placeholder content for a new session
pub fn seed_content(title: &str, assignment_id: &str) -> String {
    format!("# {}\n# Assignment: {}\n\n", title, assignment_id)
}

/// Settings resolved by the registry before a session is built
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub title: String,
    pub language: String,
    pub max_participants: usize,
    pub is_public: bool,
    pub lecturer_assistance: bool,
}

/// Outcome of a successful join
#[derive(Debug, Clone)]
pub struct Admission {
    pub participant: Participant,
    /// This join moved the session from Waiting to Active
    pub activated: bool,
    /// The user was already on the roster
    pub rejoined: bool,
    /// The user was already online, so the live roster is unchanged
    pub already_online: bool,
}

/// Outcome of marking a participant offline
#[derive(Debug, Clone)]
pub struct Departure {
    pub participant: Participant,
    /// Set when this departure ended the session
    pub ended: Option<EndReason>,
}

/// One collaborative editing room
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    title: String,
    assignment_id: String,
    host_id: String,
    status: SessionStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    participants: Vec<Participant>,
    base_content: String,
    content: String,
    language: String,
    history: Vec<Change>,
    compacted: usize,
    max_participants: usize,
    is_public: bool,
    lecturer_assistance: bool,
}

impl Session {
    /// Create a session in `Waiting` with the host as sole participant
    pub fn new(
        id: impl Into<String>,
        host_id: impl Into<String>,
        host_name: impl Into<String>,
        assignment_id: impl Into<String>,
        settings: SessionSettings,
        now: DateTime<Utc>,
    ) -> Self {
        let host_id = host_id.into();
        let assignment_id = assignment_id.into();
        let seed = seed_content(&settings.title, &assignment_id);
        let host = Participant::new(
            host_id.clone(),
            host_name,
            ParticipantRole::Host,
            color_for_index(0),
            now,
        );

        Self {
            id: id.into(),
            title: settings.title,
            assignment_id,
            host_id,
            status: SessionStatus::Waiting,
            created_at: now,
            updated_at: now,
            participants: vec![host],
            base_content: seed.clone(),
            content: seed,
            language: settings.language,
            history: Vec::new(),
            compacted: 0,
            max_participants: settings.max_participants,
            is_public: settings.is_public,
            lecturer_assistance: settings.lecturer_assistance,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn lecturer_assistance(&self) -> bool {
        self.lecturer_assistance
    }

    pub fn max_participants(&self) -> usize {
        self.max_participants
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    fn participant_mut(&mut self, user_id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.user_id == user_id)
    }

    /// Participants currently online
    pub fn online_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_online).count()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.participant(user_id).is_some_and(|p| p.is_online)
    }

    /// Changes still held in memory, oldest first
    pub fn history(&self) -> &[Change] {
        &self.history
    }

    /// Number of changes folded into the base content by compaction
    pub fn history_offset(&self) -> usize {
        self.compacted
    }

    /// Total number of changes ever applied
    pub fn change_count(&self) -> usize {
        self.compacted + self.history.len()
    }

    /// Content the retained history is folded over
    pub fn base_content(&self) -> &str {
        &self.base_content
    }

    /// Add or re-activate a participant
    ///
    /// Re-joining an existing user flips them online without duplicating the
    /// roster entry and keeps their original role. The capacity check only
    /// applies to users who would add to the live count, and never to
    /// lecturers.
    pub fn admit(
        &mut self,
        user_id: &str,
        user_name: &str,
        role: ParticipantRole,
        now: DateTime<Utc>,
    ) -> CollabResult<Admission> {
        if !self.status.is_open() {
            return Err(CollabError::SessionInactive {
                session_id: self.id.clone(),
                status: self.status,
                expected: "waiting or active",
            });
        }

        let online = self.online_count();
        let existing = self
            .participant(user_id)
            .map(|p| (p.is_online, p.role));
        let effective_role = existing.map(|(_, r)| r).unwrap_or(role);
        let adds_to_live = !matches!(existing, Some((true, _)));

        if adds_to_live && online >= self.max_participants && !effective_role.bypasses_capacity()
        {
            return Err(CollabError::SessionFull {
                session_id: self.id.clone(),
                max_participants: self.max_participants,
            });
        }

        let rejoined = existing.is_some();
        if let Some(participant) = self.participant_mut(user_id) {
            participant.is_online = true;
            participant.touch(now);
        } else {
            // Only the creator is ever host
            let role = match role {
                ParticipantRole::Host => ParticipantRole::Participant,
                other => other,
            };
            let color = color_for_index(self.participants.len());
            self.participants
                .push(Participant::new(user_id, user_name, role, color, now));
        }

        let activated = self.status == SessionStatus::Waiting && self.online_count() > 1;
        if activated {
            self.status = SessionStatus::Active;
        }
        self.touch(now);

        let participant = self
            .participant(user_id)
            .cloned()
            .ok_or_else(|| CollabError::ParticipantNotFound {
                session_id: self.id.clone(),
                user_id: user_id.to_string(),
            })?;

        Ok(Admission {
            participant,
            activated,
            rejoined,
            already_online: !adds_to_live,
        })
    }

    /// Mark a participant offline, ending the session when the host leaves
    /// or nobody is left online
    pub fn mark_offline(&mut self, user_id: &str, now: DateTime<Utc>) -> CollabResult<Departure> {
        let session_id = self.id.clone();
        let participant = self.participant_mut(user_id).ok_or_else(|| {
            CollabError::ParticipantNotFound {
                session_id,
                user_id: user_id.to_string(),
            }
        })?;
        participant.is_online = false;
        participant.touch(now);
        let participant = participant.clone();

        let reason = if participant.user_id == self.host_id {
            Some(EndReason::HostLeft)
        } else if self.online_count() == 0 {
            Some(EndReason::Empty)
        } else {
            None
        };

        let ended = reason.filter(|_| self.end(now));
        self.touch(now);

        Ok(Departure { participant, ended })
    }

    /// Move to `Ended`; returns false if already ended
    pub fn end(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == SessionStatus::Ended {
            return false;
        }
        self.status = SessionStatus::Ended;
        self.touch(now);
        true
    }

    /// Apply one edit in arrival order
    ///
    /// Rejected without mutation unless the session is `Active` and the
    /// author is online in it.
    pub fn apply_change(
        &mut self,
        author_id: &str,
        operation: Operation,
        now: DateTime<Utc>,
    ) -> CollabResult<Change> {
        if self.status != SessionStatus::Active {
            return Err(CollabError::SessionInactive {
                session_id: self.id.clone(),
                status: self.status,
                expected: "active",
            });
        }
        if !self.is_online(author_id) {
            return Err(CollabError::NotInSession(author_id.to_string()));
        }

        let content = apply_operation(&self.content, &operation);
        let change = Change::new(author_id, operation, now);

        self.content = content;
        self.history.push(change.clone());
        if let Some(author) = self.participant_mut(author_id) {
            author.touch(now);
        }
        self.touch(now);

        Ok(change)
    }

    /// Record a cursor move for an online participant
    pub fn move_cursor(
        &mut self,
        user_id: &str,
        position: usize,
        now: DateTime<Utc>,
    ) -> CollabResult<Participant> {
        let participant = self
            .participant_mut(user_id)
            .filter(|p| p.is_online)
            .ok_or_else(|| CollabError::NotInSession(user_id.to_string()))?;
        participant.cursor_position = position;
        participant.touch(now);
        Ok(participant.clone())
    }

    /// Raise the lecturer-assistance flag; it is never cleared
    pub fn request_assistance(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> CollabResult<Participant> {
        if !self.status.is_open() {
            return Err(CollabError::SessionInactive {
                session_id: self.id.clone(),
                status: self.status,
                expected: "waiting or active",
            });
        }
        let session_id = self.id.clone();
        let participant = self
            .participant_mut(user_id)
            .ok_or_else(|| CollabError::ParticipantNotFound {
                session_id,
                user_id: user_id.to_string(),
            })?;
        participant.touch(now);
        let participant = participant.clone();

        self.lecturer_assistance = true;
        self.touch(now);
        Ok(participant)
    }

    /// Fold all but the newest `keep_last` changes into the base content
    ///
    /// Returns the number of changes compacted. Content is unchanged.
    pub fn compact(&mut self, keep_last: usize) -> usize {
        if self.history.len() <= keep_last {
            return 0;
        }
        let cut = self.history.len() - keep_last;
        let folded: Vec<Change> = self.history.drain(..cut).collect();
        self.base_content = fold_changes(&self.base_content, &folded);
        self.compacted += cut;
        cut
    }

    /// Waiting sessions nobody is in, or nobody has touched for `timeout`
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.status == SessionStatus::Waiting
            && (self.online_count() == 0 || now - self.updated_at >= timeout)
    }

    /// Eligible for the public browser
    pub fn is_joinable_publicly(&self) -> bool {
        self.is_public && self.status.is_open() && self.online_count() < self.max_participants
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Read-only snapshot
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            title: self.title.clone(),
            assignment_id: self.assignment_id.clone(),
            host_id: self.host_id.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            participants: self.participants.clone(),
            content: self.content.clone(),
            language: self.language.clone(),
            online_count: self.online_count(),
            max_participants: self.max_participants,
            is_public: self.is_public,
            lecturer_assistance: self.lecturer_assistance,
            change_count: self.change_count(),
        }
    }

    pub fn public_summary(&self) -> PublicSessionSummary {
        let host_name = self
            .participant(&self.host_id)
            .map(|p| p.user_name.clone())
            .unwrap_or_default();

        PublicSessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            assignment_id: self.assignment_id.clone(),
            host_id: self.host_id.clone(),
            host_name,
            status: self.status,
            language: self.language.clone(),
            online_count: self.online_count(),
            max_participants: self.max_participants,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max: usize) -> SessionSettings {
        SessionSettings {
            title: "Pair work".to_string(),
            language: "python".to_string(),
            max_participants: max,
            is_public: false,
            lecturer_assistance: false,
        }
    }

    fn new_session(max: usize) -> Session {
        Session::new("s1", "h1", "Host", "a1", settings(max), Utc::now())
    }

    #[test]
    fn test_new_session_is_waiting_with_host() {
        let session = new_session(4);
        assert_eq!(session.status(), SessionStatus::Waiting);
        assert_eq!(session.participants().len(), 1);
        assert_eq!(session.participants()[0].role, ParticipantRole::Host);
        assert_eq!(session.content(), seed_content("Pair work", "a1"));
    }

    #[test]
    fn test_second_join_activates() {
        let mut session = new_session(4);
        let admission = session
            .admit("p1", "Bob", ParticipantRole::Participant, Utc::now())
            .unwrap();
        assert!(admission.activated);
        assert!(!admission.rejoined);
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(admission.participant.color, color_for_index(1));
    }

    #[test]
    fn test_lecturer_join_activates_waiting_session() {
        let mut session = new_session(4);
        assert_eq!(session.status(), SessionStatus::Waiting);

        let admission = session
            .admit("l1", "Dr. Ada", ParticipantRole::Lecturer, Utc::now())
            .unwrap();
        assert!(admission.activated);
        assert_eq!(admission.participant.role, ParticipantRole::Lecturer);
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.online_count(), 2);
    }

    #[test]
    fn test_rejoin_is_idempotent() {
        let mut session = new_session(4);
        let now = Utc::now();
        session.admit("p1", "Bob", ParticipantRole::Participant, now).unwrap();
        session.mark_offline("p1", now).unwrap();
        assert_eq!(session.online_count(), 1);

        let admission = session
            .admit("p1", "Bob", ParticipantRole::Participant, now)
            .unwrap();
        assert!(admission.rejoined);
        assert_eq!(session.participants().len(), 2);
        assert_eq!(session.online_count(), 2);

        assert!(!admission.already_online);

        // Already online: no duplicate, no capacity check
        let again = session
            .admit("p1", "Bob", ParticipantRole::Participant, now)
            .unwrap();
        assert!(again.already_online);
        assert_eq!(session.participants().len(), 2);
    }

    #[test]
    fn test_join_cannot_claim_host() {
        let mut session = new_session(4);
        let admission = session
            .admit("p1", "Mallory", ParticipantRole::Host, Utc::now())
            .unwrap();
        assert_eq!(admission.participant.role, ParticipantRole::Participant);
        assert_eq!(session.host_id(), "h1");
    }

    #[test]
    fn test_capacity_and_lecturer_bypass() {
        let mut session = new_session(2);
        let now = Utc::now();
        session.admit("p1", "Bob", ParticipantRole::Participant, now).unwrap();

        let err = session
            .admit("p2", "Eve", ParticipantRole::Observer, now)
            .unwrap_err();
        assert!(matches!(err, CollabError::SessionFull { .. }));

        session.admit("l1", "Prof", ParticipantRole::Lecturer, now).unwrap();
        assert_eq!(session.online_count(), 3);
    }

    #[test]
    fn test_apply_change_requires_active() {
        let mut session = new_session(4);
        let before = session.content().to_string();
        let err = session
            .apply_change("h1", Operation::insert(0, "x"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CollabError::SessionInactive { .. }));
        assert_eq!(session.content(), before);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_apply_change_requires_online_author() {
        let mut session = new_session(4);
        let now = Utc::now();
        session.admit("p1", "Bob", ParticipantRole::Participant, now).unwrap();
        session.admit("p2", "Eve", ParticipantRole::Participant, now).unwrap();
        session.mark_offline("p2", now).unwrap();

        let err = session
            .apply_change("p2", Operation::insert(0, "x"), now)
            .unwrap_err();
        assert!(matches!(err, CollabError::NotInSession(_)));
    }

    #[test]
    fn test_host_leaving_ends_session() {
        let mut session = new_session(4);
        let now = Utc::now();
        session.admit("p1", "Bob", ParticipantRole::Participant, now).unwrap();

        let departure = session.mark_offline("h1", now).unwrap();
        assert_eq!(departure.ended, Some(EndReason::HostLeft));
        assert_eq!(session.status(), SessionStatus::Ended);

        // Roster is preserved
        assert_eq!(session.participants().len(), 2);
    }

    #[test]
    fn test_non_host_leaving_keeps_active() {
        let mut session = new_session(4);
        let now = Utc::now();
        session.admit("p1", "Bob", ParticipantRole::Participant, now).unwrap();
        session.admit("p2", "Eve", ParticipantRole::Participant, now).unwrap();

        let departure = session.mark_offline("p1", now).unwrap();
        assert_eq!(departure.ended, None);
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn test_join_after_end_is_rejected() {
        let mut session = new_session(4);
        let now = Utc::now();
        session.mark_offline("h1", now).unwrap();
        let err = session
            .admit("p1", "Bob", ParticipantRole::Participant, now)
            .unwrap_err();
        assert!(matches!(err, CollabError::SessionInactive { .. }));
    }

    #[test]
    fn test_compaction_preserves_content() {
        let mut session = new_session(4);
        let now = Utc::now();
        session.admit("p1", "Bob", ParticipantRole::Participant, now).unwrap();
        for i in 0..10 {
            session
                .apply_change("h1", Operation::insert(0, i.to_string()), now)
                .unwrap();
        }
        let content = session.content().to_string();

        assert_eq!(session.compact(3), 7);
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history_offset(), 7);
        assert_eq!(session.change_count(), 10);
        assert_eq!(session.content(), content);
        assert_eq!(
            fold_changes(session.base_content(), session.history()),
            content
        );
        assert_eq!(session.compact(3), 0);
    }

    #[test]
    fn test_assistance_flag_is_monotonic() {
        let mut session = new_session(4);
        let now = Utc::now();
        assert!(!session.lecturer_assistance());
        session.request_assistance("h1", now).unwrap();
        session.request_assistance("h1", now).unwrap();
        assert!(session.lecturer_assistance());

        let err = session.request_assistance("stranger", now).unwrap_err();
        assert!(matches!(err, CollabError::ParticipantNotFound { .. }));
    }

    #[test]
    fn test_idle_detection() {
        let now = Utc::now();
        let session = Session::new("s1", "h1", "Host", "a1", settings(4), now);
        assert!(!session.is_idle(now, Duration::minutes(5)));
        assert!(session.is_idle(now + Duration::minutes(5), Duration::minutes(5)));
    }
}
