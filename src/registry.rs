use std::collections::{BTreeMap, BTreeSet, HashMap};

use uuid::Uuid;

use crate::error::{EbdError, Result};
use crate::models::{AgeGroup, Class, ClassName, Student};

/// Name-keyed lookup over the formal class records.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    by_name: HashMap<ClassName, Class>,
}

impl ClassRegistry {
    pub fn from_classes(classes: &[Class]) -> Self {
        let by_name = classes
            .iter()
            .map(|class| (class.name.clone(), class.clone()))
            .collect();
        Self { by_name }
    }

    pub fn get(&self, name: &ClassName) -> Option<&Class> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &ClassName) -> bool {
        self.by_name.contains_key(name)
    }
}

/// Formal classes plus any class name a student references, sorted.
pub fn available_classes(classes: &[Class], students: &[Student]) -> BTreeSet<ClassName> {
    classes
        .iter()
        .map(|class| class.name.clone())
        .chain(students.iter().map(|student| student.class_name.clone()))
        .filter(|name| !name.as_str().trim().is_empty())
        .collect()
}

/// Students whose class name matches no formal class record.
pub fn find_orphaned_students<'a>(classes: &[Class], students: &'a [Student]) -> Vec<&'a Student> {
    let registry = ClassRegistry::from_classes(classes);
    students
        .iter()
        .filter(|student| !registry.contains(&student.class_name))
        .collect()
}

/// Rejects incoming classes that reuse a stored id under a different name.
/// Renaming a class by id is not supported; matching is by name.
pub fn check_class_ids(existing: &[(Uuid, ClassName)], incoming: &[Class]) -> Result<()> {
    let names_by_id: HashMap<Uuid, &ClassName> =
        existing.iter().map(|(id, name)| (*id, name)).collect();

    for class in incoming {
        let Some(id) = class.id else { continue };
        if let Some(stored) = names_by_id.get(&id) {
            if *stored != &class.name {
                return Err(EbdError::ClassIdConflict {
                    id,
                    existing: stored.to_string(),
                    incoming: class.name.to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn roster<'a>(class_name: &ClassName, students: &'a [Student]) -> Vec<&'a Student> {
    let mut members: Vec<&Student> = students
        .iter()
        .filter(|student| &student.class_name == class_name)
        .collect();
    members.sort_by(|a, b| a.name.cmp(&b.name));
    members
}

pub fn count_by_age_group(students: &[Student]) -> BTreeMap<AgeGroup, usize> {
    let mut counts: BTreeMap<AgeGroup, usize> =
        AgeGroup::ALL.into_iter().map(|group| (group, 0)).collect();
    for student in students {
        *counts.entry(student.age_group).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> Class {
        Class {
            id: Some(Uuid::new_v4()),
            name: ClassName::new(name),
            teacher_name: Some("Pr. João".to_string()),
            age_group_criterion: AgeGroup::Adult,
        }
    }

    fn student(name: &str, class_name: &str, age_group: AgeGroup) -> Student {
        Student {
            id: Uuid::new_v4(),
            name: name.to_string(),
            age_group,
            class_name: ClassName::new(class_name),
            enrollment_date: None,
        }
    }

    #[test]
    fn available_classes_unions_formal_and_referenced() {
        let classes = vec![class("Adultos"), class("Jovens")];
        let students = vec![
            student("Ana", "Adultos", AgeGroup::Adult),
            student("Davi", "Kids", AgeGroup::Child),
            student("Sem turma", "", AgeGroup::Teen),
        ];

        let names: Vec<String> = available_classes(&classes, &students)
            .into_iter()
            .map(|name| name.0)
            .collect();
        assert_eq!(names, vec!["Adultos", "Jovens", "Kids"]);
    }

    #[test]
    fn orphans_are_students_without_class_record() {
        let classes = vec![class("Jovens")];
        let students = vec![
            student("Ana", "Adultos", AgeGroup::Adult),
            student("Lucas", "Jovens", AgeGroup::Youth),
        ];

        let orphans = find_orphaned_students(&classes, &students);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].name, "Ana");
    }

    #[test]
    fn registry_lookup_by_name() {
        let registry = ClassRegistry::from_classes(&[class("Adultos")]);
        assert!(registry.get(&ClassName::new("Adultos")).is_some());
        assert!(!registry.contains(&ClassName::new("Kids")));
    }

    #[test]
    fn class_ids_may_be_reused_under_the_same_name() {
        let adultos = class("Adultos");
        let existing = vec![(adultos.id.unwrap(), adultos.name.clone())];
        let mut implicit = class("Kids");
        implicit.id = None;

        assert!(check_class_ids(&existing, &[adultos, implicit, class("Jovens")]).is_ok());
    }

    #[test]
    fn class_id_reused_under_new_name_is_rejected() {
        let adultos = class("Adultos");
        let existing = vec![(adultos.id.unwrap(), adultos.name.clone())];
        let mut renamed = adultos.clone();
        renamed.name = ClassName::new("Casais");

        let err = check_class_ids(&existing, &[class("Jovens"), renamed]).unwrap_err();
        assert!(matches!(
            err,
            EbdError::ClassIdConflict { ref existing, ref incoming, .. }
                if existing == "Adultos" && incoming == "Casais"
        ));
    }

    #[test]
    fn roster_is_sorted_by_name() {
        let students = vec![
            student("Rute", "Adultos", AgeGroup::Adult),
            student("Abel", "Adultos", AgeGroup::Adult),
            student("Lia", "Jovens", AgeGroup::Youth),
        ];

        let names: Vec<&str> = roster(&ClassName::new("Adultos"), &students)
            .into_iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Abel", "Rute"]);
    }

    #[test]
    fn age_group_counts_include_empty_buckets() {
        let students = vec![
            student("Ana", "Adultos", AgeGroup::Adult),
            student("Davi", "Kids", AgeGroup::Child),
            student("Eva", "Kids", AgeGroup::Child),
        ];

        let counts = count_by_age_group(&students);
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[&AgeGroup::Child], 2);
        assert_eq!(counts[&AgeGroup::Adult], 1);
        assert_eq!(counts[&AgeGroup::Preschool], 0);
    }
}
