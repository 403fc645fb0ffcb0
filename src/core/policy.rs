use crate::core::record::FileRecord;
use std::fmt;

/// Why a group was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Veto {
    /// The kept copy lost the camera model that a lower-resolution copy still has.
    CameraModelAsymmetry,
    /// The kept copy is smaller on disk than every copy marked for removal.
    SizeInversion {
        preferred: u64,
        smallest_candidate: u64,
    },
    /// A byte size is missing, so the size check cannot be made.
    UnknownSize,
}

impl fmt::Display for Veto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Veto::CameraModelAsymmetry => {
                f.write_str("a lower-resolution copy has a camera model the preferred copy lacks")
            }
            Veto::SizeInversion {
                preferred,
                smallest_candidate,
            } => write!(
                f,
                "preferred copy ({} bytes) is smaller than every copy marked for removal (smallest {} bytes)",
                preferred, smallest_candidate
            ),
            Veto::UnknownSize => f.write_str("byte size missing on at least one copy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome<'a> {
    Vetoed {
        preferred: &'a FileRecord,
        candidates: Vec<&'a FileRecord>,
        veto: Veto,
    },
    DeleteSet {
        preferred: &'a FileRecord,
        targets: Vec<&'a FileRecord>,
    },
}

impl<'a> ResolutionOutcome<'a> {
    pub fn preferred(&self) -> &'a FileRecord {
        match self {
            ResolutionOutcome::Vetoed { preferred, .. }
            | ResolutionOutcome::DeleteSet { preferred, .. } => *preferred,
        }
    }

    /// Lower-resolution members, whether or not they will be removed.
    pub fn others(&self) -> &[&'a FileRecord] {
        match self {
            ResolutionOutcome::Vetoed { candidates, .. } => candidates,
            ResolutionOutcome::DeleteSet { targets, .. } => targets,
        }
    }

    /// Records authorized for removal; empty when vetoed.
    pub fn targets(&self) -> &[&'a FileRecord] {
        match self {
            ResolutionOutcome::Vetoed { .. } => &[],
            ResolutionOutcome::DeleteSet { targets, .. } => targets,
        }
    }

    pub fn veto(&self) -> Option<&Veto> {
        match self {
            ResolutionOutcome::Vetoed { veto, .. } => Some(veto),
            ResolutionOutcome::DeleteSet { .. } => None,
        }
    }
}

/// Decide what to do with a group whose members are sorted ascending by
/// resolution. Returns `None` for groups with fewer than two members.
pub fn evaluate<'a>(members: &[&'a FileRecord]) -> Option<ResolutionOutcome<'a>> {
    let (&preferred, rest) = members.split_last()?;
    if rest.is_empty() {
        return None;
    }
    let candidates = rest.to_vec();

    match check_vetoes(preferred, &candidates) {
        Some(veto) => Some(ResolutionOutcome::Vetoed {
            preferred,
            candidates,
            veto,
        }),
        None => Some(ResolutionOutcome::DeleteSet {
            preferred,
            targets: candidates,
        }),
    }
}

fn check_vetoes(preferred: &FileRecord, candidates: &[&FileRecord]) -> Option<Veto> {
    if !preferred.has_camera_model() && candidates.iter().any(|c| c.has_camera_model()) {
        return Some(Veto::CameraModelAsymmetry);
    }

    let Some(preferred_size) = preferred.size else {
        return Some(Veto::UnknownSize);
    };
    let sizes: Option<Vec<u64>> = candidates.iter().map(|c| c.size).collect();
    let Some(smallest_candidate) = sizes.and_then(|sizes| sizes.into_iter().min()) else {
        return Some(Veto::UnknownSize);
    };

    if preferred_size < smallest_candidate {
        return Some(Veto::SizeInversion {
            preferred: preferred_size,
            smallest_candidate,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::fixtures::*;

    #[test]
    fn test_highest_resolution_is_preferred() {
        let small = photo("a", "x.jpg", 100, 100, 1000);
        let mid = photo("b", "x.jpg", 2000, 1500, 3000);
        let big = photo("c", "x.jpg", 4000, 3000, 5000);

        let outcome = evaluate(&[&small, &mid, &big]).unwrap();
        assert_eq!(outcome.preferred().id, "c");
        let targets: Vec<&str> = outcome.targets().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(targets, vec!["a", "b"]);
        assert!(outcome.veto().is_none());
    }

    #[test]
    fn test_preferred_never_targeted() {
        let small = photo("a", "x.jpg", 100, 100, 1000);
        let big = photo("b", "x.jpg", 4000, 3000, 5000);

        let outcome = evaluate(&[&small, &big]).unwrap();
        assert!(!outcome.targets().iter().any(|r| r.id == outcome.preferred().id));
    }

    #[test]
    fn test_veto_camera_model_asymmetry() {
        let small = with_camera(photo("a", "x.jpg", 100, 100, 1000), "X");
        let big = photo("b", "x.jpg", 4000, 3000, 5000);

        let outcome = evaluate(&[&small, &big]).unwrap();
        assert_eq!(outcome.veto(), Some(&Veto::CameraModelAsymmetry));
        assert!(outcome.targets().is_empty());
        assert_eq!(outcome.others().len(), 1);
    }

    #[test]
    fn test_camera_model_on_both_is_fine() {
        let small = with_camera(photo("a", "x.jpg", 100, 100, 1000), "X");
        let big = with_camera(photo("b", "x.jpg", 4000, 3000, 5000), "X");

        let outcome = evaluate(&[&small, &big]).unwrap();
        assert!(outcome.veto().is_none());
    }

    #[test]
    fn test_veto_size_inversion() {
        let a = photo("a", "x.jpg", 100, 100, 150);
        let b = photo("b", "x.jpg", 200, 200, 200);
        let preferred = photo("c", "x.jpg", 4000, 3000, 100);

        let outcome = evaluate(&[&a, &b, &preferred]).unwrap();
        assert_eq!(
            outcome.veto(),
            Some(&Veto::SizeInversion {
                preferred: 100,
                smallest_candidate: 150
            })
        );
    }

    #[test]
    fn test_size_check_uses_smallest_candidate() {
        let a = photo("a", "x.jpg", 100, 100, 50);
        let b = photo("b", "x.jpg", 200, 200, 200);
        let preferred = photo("c", "x.jpg", 4000, 3000, 100);

        let outcome = evaluate(&[&a, &b, &preferred]).unwrap();
        assert!(outcome.veto().is_none());
        assert_eq!(outcome.targets().len(), 2);
    }

    #[test]
    fn test_equal_size_is_not_vetoed() {
        let a = photo("a", "x.jpg", 100, 100, 100);
        let preferred = photo("b", "x.jpg", 4000, 3000, 100);

        let outcome = evaluate(&[&a, &preferred]).unwrap();
        assert!(outcome.veto().is_none());
    }

    #[test]
    fn test_missing_size_vetoes() {
        let mut a = photo("a", "x.jpg", 100, 100, 100);
        a.size = None;
        let preferred = photo("b", "x.jpg", 4000, 3000, 5000);

        let outcome = evaluate(&[&a, &preferred]).unwrap();
        assert_eq!(outcome.veto(), Some(&Veto::UnknownSize));
    }

    #[test]
    fn test_camera_veto_checked_before_size() {
        let a = with_camera(photo("a", "x.jpg", 100, 100, 900), "X");
        let preferred = photo("b", "x.jpg", 4000, 3000, 100);

        let outcome = evaluate(&[&a, &preferred]).unwrap();
        assert_eq!(outcome.veto(), Some(&Veto::CameraModelAsymmetry));
    }

    #[test]
    fn test_single_member_has_no_outcome() {
        let only = photo("a", "x.jpg", 100, 100, 100);
        assert!(evaluate(&[&only]).is_none());
        assert!(evaluate(&[]).is_none());
    }
}
