//! Idempotent upserts for sub-resources
//!
//! Tower signals "already exists" with a 409 and offers no create-if-absent
//! call, so labels, organization members and workspace participants are
//! ensured in steps: attempt the create, absorb the conflict, resolve the
//! record from a listing, then assign a role where the add call cannot
//! carry one.
//!
//! Each ensure runs one [`Reconciliation`] per subject. Steps are strictly
//! sequential; any error other than the absorbed conflict aborts the run.

use crate::entities::labels::Label;
use crate::entities::org_members::{OrgRole, OrganizationMember};
use crate::entities::participants::{ParticipantRef, WorkspaceParticipant, WorkspaceRole};
use crate::tower::classify::Classified;
use crate::tower::client::TowerClient;
use crate::tower::error::{Result, TowerError};

/// Progress of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileState {
    Creating,
    Conflict,
    Resolving,
    RoleAssigning,
    Done,
    Failed,
}

impl ReconcileState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: ReconcileState) -> bool {
        use ReconcileState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Creating, Conflict | Resolving | RoleAssigning | Done) => true,
            (Conflict, Resolving) => true,
            (Resolving, RoleAssigning | Done) => true,
            (RoleAssigning, Done) => true,
            _ => false,
        }
    }
}

/// State tracker for ensuring a single subject.
#[derive(Debug)]
pub struct Reconciliation {
    kind: &'static str,
    subject: String,
    state: ReconcileState,
}

impl Reconciliation {
    pub fn start(kind: &'static str, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        tracing::debug!("Ensuring {} '{}'", kind, subject);
        Self {
            kind,
            subject,
            state: ReconcileState::Creating,
        }
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Move to `next`, rejecting transitions the machine does not allow.
    pub fn advance(&mut self, next: ReconcileState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(TowerError::Inconsistent(format!(
                "{} '{}': cannot move from {:?} to {:?}",
                self.kind, self.subject, self.state, next
            )));
        }
        tracing::trace!(
            "{} '{}': {:?} -> {:?}",
            self.kind,
            self.subject,
            self.state,
            next
        );
        self.state = next;
        Ok(())
    }

    /// Mark the run failed and hand the error back for propagation.
    pub fn fail(&mut self, error: TowerError) -> TowerError {
        tracing::debug!(
            "{} '{}' failed in {:?}: {}",
            self.kind,
            self.subject,
            self.state,
            error
        );
        self.state = ReconcileState::Failed;
        error
    }

    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }

    fn absent(&mut self) -> TowerError {
        let error = TowerError::Inconsistent(format!(
            "{} '{}': creation reported a missing resource",
            self.kind, self.subject
        ));
        self.fail(error)
    }
}

impl TowerClient {
    /// Make sure every named label exists in the workspace.
    ///
    /// Returns the labels that resolved by exact, case-sensitive name.
    /// Names still missing from the listing after creation are logged and
    /// left out of the result.
    pub async fn ensure_labels<S: AsRef<str>>(
        &self,
        workspace_id: i64,
        names: &[S],
    ) -> Result<Vec<Label>> {
        let mut desired: Vec<&str> = Vec::with_capacity(names.len());
        for name in names {
            if !desired.contains(&name.as_ref()) {
                desired.push(name.as_ref());
            }
        }
        if desired.is_empty() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::with_capacity(desired.len());
        for name in desired {
            let mut run = Reconciliation::start("label", name);
            match run.check(self.create_label(workspace_id, name).await)? {
                Classified::Value(_) => {}
                Classified::Exists => run.advance(ReconcileState::Conflict)?,
                Classified::Absent => return Err(run.absent()),
            }
            run.advance(ReconcileState::Resolving)?;
            runs.push(run);
        }

        let listing = match self.list_labels(workspace_id).await {
            Ok(listing) => listing,
            Err(error) => {
                for run in &mut runs {
                    run.state = ReconcileState::Failed;
                }
                return Err(error);
            }
        };

        let mut resolved = Vec::with_capacity(runs.len());
        for mut run in runs {
            match listing.iter().find(|label| label.name == run.subject) {
                Some(label) => {
                    run.advance(ReconcileState::Done)?;
                    resolved.push(label.clone());
                }
                None => {
                    tracing::warn!(
                        "Label '{}' is missing from workspace {} after creation, skipping it",
                        run.subject,
                        workspace_id
                    );
                    run.advance(ReconcileState::Failed)?;
                }
            }
        }
        Ok(resolved)
    }

    /// Make sure `email` belongs to the organization with `role`.
    ///
    /// The role is always assigned, whether the member was just added or
    /// already existed.
    pub async fn ensure_organization_member(
        &self,
        email: &str,
        role: OrgRole,
    ) -> Result<OrganizationMember> {
        let mut run = Reconciliation::start("organization member", email);

        let member = match run.check(self.add_organization_member(email).await)? {
            Classified::Value(member) => member,
            Classified::Exists => {
                run.advance(ReconcileState::Conflict)?;
                run.advance(ReconcileState::Resolving)?;
                let members = run.check(self.list_organization_members().await)?;
                match members.into_iter().find(|m| m.email == email) {
                    Some(member) => member,
                    None => {
                        return Err(run.fail(TowerError::Inconsistent(format!(
                            "{} is already a member of organization {} but is not listed",
                            email,
                            self.organization_id()
                        ))))
                    }
                }
            }
            Classified::Absent => return Err(run.absent()),
        };

        run.advance(ReconcileState::RoleAssigning)?;
        run.check(
            self.update_organization_member_role(member.member_id, role)
                .await,
        )?;
        run.advance(ReconcileState::Done)?;

        Ok(OrganizationMember { role, ..member })
    }

    /// Make sure a member participates in the workspace with `role`.
    pub async fn ensure_workspace_participant(
        &self,
        workspace_id: i64,
        participant: &ParticipantRef,
        role: WorkspaceRole,
    ) -> Result<WorkspaceParticipant> {
        let mut run = Reconciliation::start("workspace participant", participant.to_string());

        let found = match run.check(self.add_workspace_participant(workspace_id, participant).await)? {
            Classified::Value(found) => found,
            Classified::Exists => {
                run.advance(ReconcileState::Conflict)?;
                run.advance(ReconcileState::Resolving)?;
                match run.check(self.get_workspace_participant(workspace_id, participant).await)? {
                    Some(found) => found,
                    None => {
                        return Err(run.fail(TowerError::Inconsistent(format!(
                            "{participant} is already a participant of workspace {workspace_id} but is not listed"
                        ))))
                    }
                }
            }
            Classified::Absent => return Err(run.absent()),
        };

        run.advance(ReconcileState::RoleAssigning)?;
        run.check(
            self.update_workspace_participant_role(workspace_id, found.participant_id, role)
                .await,
        )?;
        run.advance(ReconcileState::Done)?;

        Ok(WorkspaceParticipant { role, ..found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReconcileState::*;

    #[test]
    fn test_terminal_states_are_final() {
        for next in [Creating, Conflict, Resolving, RoleAssigning, Done, Failed] {
            assert!(!Done.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
        assert!(Done.is_terminal());
        assert!(!Resolving.is_terminal());
    }

    #[test]
    fn test_conflict_must_resolve() {
        assert!(Creating.can_transition_to(Conflict));
        assert!(Conflict.can_transition_to(Resolving));
        assert!(!Conflict.can_transition_to(RoleAssigning));
        assert!(!Conflict.can_transition_to(Done));
    }

    #[test]
    fn test_every_live_state_can_fail() {
        for state in [Creating, Conflict, Resolving, RoleAssigning] {
            assert!(state.can_transition_to(Failed));
        }
    }

    #[test]
    fn test_illegal_advance_is_rejected() {
        let mut run = Reconciliation::start("label", "release");
        run.advance(Conflict).unwrap();
        let err = run.advance(Done).unwrap_err();
        assert!(matches!(err, TowerError::Inconsistent(_)));
        assert_eq!(run.state(), Conflict);
    }

    #[test]
    fn test_fail_records_state() {
        let mut run = Reconciliation::start("organization member", "a@b.org");
        run.advance(RoleAssigning).unwrap();
        let err = run.fail(TowerError::EmptyResponse);
        assert!(matches!(err, TowerError::EmptyResponse));
        assert_eq!(run.state(), Failed);
        assert_eq!(run.subject(), "a@b.org");
    }
}
