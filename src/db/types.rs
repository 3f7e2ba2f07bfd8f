use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    NewStudent,
    Teacher,
    Admin,
    SuperAdmin,
}

impl UserRole {
    pub(crate) fn is_staff(self) -> bool {
        matches!(self, UserRole::Teacher | UserRole::Admin | UserRole::SuperAdmin)
    }

    pub(crate) fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }

    /// Which exam kind this student category sits. Staff roles sit none.
    pub(crate) fn exam_kind(self) -> Option<ExamKind> {
        match self {
            UserRole::Student => Some(ExamKind::Internal),
            UserRole::NewStudent => Some(ExamKind::External),
            UserRole::Teacher | UserRole::Admin | UserRole::SuperAdmin => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "examkind", rename_all = "lowercase")]
pub(crate) enum ExamKind {
    Internal,
    External,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_categories_map_to_exam_kinds() {
        assert_eq!(UserRole::Student.exam_kind(), Some(ExamKind::Internal));
        assert_eq!(UserRole::NewStudent.exam_kind(), Some(ExamKind::External));
        assert_eq!(UserRole::Teacher.exam_kind(), None);
        assert_eq!(UserRole::SuperAdmin.exam_kind(), None);
    }

    #[test]
    fn staff_roles() {
        assert!(UserRole::Teacher.is_staff());
        assert!(UserRole::Admin.is_staff());
        assert!(UserRole::SuperAdmin.is_staff());
        assert!(!UserRole::Student.is_staff());
        assert!(!UserRole::NewStudent.is_staff());
        assert!(!UserRole::Teacher.is_admin());
        assert!(UserRole::Admin.is_admin());
    }
}
