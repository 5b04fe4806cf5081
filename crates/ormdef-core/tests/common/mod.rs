//! Shared test domain: departments, locations and employees.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use ormdef_core::definition::{DerivedDefinitionBuilder, ForeignKeyDefinition};
use ormdef_core::{
    Attribute, ColumnDefinition, DefinitionBuilder, DerivedDefinition, Domain, Entity,
    EntityDefinition, EntityType, ForeignKey, Item, Reference, Result, SourceValues,
    TransientDefinition, Value,
};

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct Department {
    pub entity_type: EntityType,
    pub id: Attribute,
    pub name: Attribute,
    pub budget: Attribute,
}

pub struct Location {
    pub entity_type: EntityType,
    pub country: Attribute,
    pub city: Attribute,
    pub name: Attribute,
}

pub struct Employee {
    pub entity_type: EntityType,
    pub id: Attribute,
    pub name: Attribute,
    pub status: Attribute,
    pub salary: Attribute,
    pub commission: Attribute,
    pub total: Attribute,
    pub total_doubled: Attribute,
    pub loaded_at: Attribute,
    pub department_id: Attribute,
    pub department_fk: ForeignKey,
    pub department_name: Attribute,
    pub country: Attribute,
    pub city: Attribute,
    pub location_fk: ForeignKey,
    pub note: Attribute,
}

/// The test domain plus counters of derived value computations.
pub struct TestDomain {
    pub domain: Arc<Domain>,
    pub department: Department,
    pub location: Location,
    pub employee: Employee,
    pub total_computations: Arc<AtomicUsize>,
    pub loaded_at_computations: Arc<AtomicUsize>,
}

impl TestDomain {
    pub fn new() -> Self {
        init_tracing();

        let department = department();
        let location = location();
        let employee = employee(&department, &location);

        let total_computations = Arc::new(AtomicUsize::new(0));
        let loaded_at_computations = Arc::new(AtomicUsize::new(0));

        let domain = Domain::builder("scott")
            .entity(department_definition(&department))
            .unwrap()
            .entity(location_definition(&location))
            .unwrap()
            .entity(employee_definition(
                &employee,
                &department,
                Arc::clone(&total_computations),
                Arc::clone(&loaded_at_computations),
            ))
            .unwrap()
            .build()
            .unwrap();

        Self {
            domain,
            department,
            location,
            employee,
            total_computations,
            loaded_at_computations,
        }
    }

    pub fn department(&self, id: i32, name: &str) -> Arc<Entity> {
        let entity = self
            .domain
            .entity(&self.department.entity_type)
            .unwrap()
            .with(&self.department.id, id)
            .unwrap()
            .with(&self.department.name, name)
            .unwrap();
        Arc::new(entity)
    }

    pub fn location(&self, country: &str, city: i32, name: &str) -> Arc<Entity> {
        let entity = self
            .domain
            .entity(&self.location.entity_type)
            .unwrap()
            .with(&self.location.country, country)
            .unwrap()
            .with(&self.location.city, city)
            .unwrap()
            .with(&self.location.name, name)
            .unwrap();
        Arc::new(entity)
    }

    pub fn employee(&self) -> Entity {
        self.domain.entity(&self.employee.entity_type).unwrap()
    }

    pub fn total_computations(&self) -> usize {
        self.total_computations.load(Ordering::SeqCst)
    }

    pub fn loaded_at_computations(&self) -> usize {
        self.loaded_at_computations.load(Ordering::SeqCst)
    }
}

fn department() -> Department {
    let entity_type = EntityType::new("scott.department");
    Department {
        id: entity_type.integer_attribute("id"),
        name: entity_type.string_attribute("name"),
        budget: entity_type.decimal_attribute("budget"),
        entity_type,
    }
}

fn location() -> Location {
    let entity_type = EntityType::new("scott.location");
    Location {
        country: entity_type.string_attribute("country"),
        city: entity_type.integer_attribute("city"),
        name: entity_type.string_attribute("name"),
        entity_type,
    }
}

fn employee(department: &Department, location: &Location) -> Employee {
    let entity_type = EntityType::new("scott.employee");
    let department_id = entity_type.integer_attribute("department_id");
    let country = entity_type.string_attribute("country");
    let city = entity_type.integer_attribute("city");
    let department_fk = ForeignKey::single(
        &entity_type,
        "department_fk",
        department_id.clone(),
        department.id.clone(),
    )
    .unwrap();
    let location_fk = ForeignKey::new(
        &entity_type,
        "location_fk",
        vec![
            Reference::new(country.clone(), location.country.clone()),
            Reference::new(city.clone(), location.city.clone()),
        ],
    )
    .unwrap();

    Employee {
        id: entity_type.integer_attribute("id"),
        name: entity_type.string_attribute("name"),
        status: entity_type.string_attribute("status"),
        salary: entity_type.double_attribute("salary"),
        commission: entity_type.double_attribute("commission"),
        total: entity_type.double_attribute("total"),
        total_doubled: entity_type.double_attribute("total_doubled"),
        loaded_at: entity_type.long_attribute("loaded_at"),
        department_name: entity_type.string_attribute("department_name"),
        note: entity_type.string_attribute("note"),
        department_id,
        department_fk,
        country,
        city,
        location_fk,
        entity_type,
    }
}

fn department_definition(department: &Department) -> EntityDefinition {
    EntityDefinition::builder(department.entity_type.clone())
        .table_name("scott.dept")
        .string_provider({
            let name = department.name.clone();
            move |entity: &Entity| entity.string_of(&name).unwrap_or_default()
        })
        .define(ColumnDefinition::primary_key(department.id.clone()))
        .unwrap()
        .define(
            ColumnDefinition::builder(department.name.clone())
                .caption(Some("Name"))
                .maximum_length(14)
                .unwrap()
                .nullable(false),
        )
        .unwrap()
        .define(
            ColumnDefinition::builder(department.budget.clone())
                .maximum_fraction_digits(2)
                .unwrap(),
        )
        .unwrap()
        .build()
        .unwrap()
}

fn location_definition(location: &Location) -> EntityDefinition {
    EntityDefinition::builder(location.entity_type.clone())
        .define(ColumnDefinition::primary_key(location.country.clone()))
        .unwrap()
        .define(ColumnDefinition::builder(location.city.clone()).primary_key_index(1))
        .unwrap()
        .define(ColumnDefinition::builder(location.name.clone()))
        .unwrap()
        .build()
        .unwrap()
}

fn sum(values: &SourceValues<'_>) -> Result<f64> {
    let mut total = 0.0;
    for source in values.sources() {
        total += values.get(source)?.as_f64().unwrap_or(0.0);
    }
    Ok(total)
}

fn total(employee: &Employee, computations: Arc<AtomicUsize>) -> DerivedDefinitionBuilder {
    DerivedDefinition::builder(
        employee.total.clone(),
        [employee.salary.clone(), employee.commission.clone()],
        move |values: &SourceValues<'_>| {
            computations.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Double(sum(values)?))
        },
    )
    .unwrap()
}

fn employee_definition(
    employee: &Employee,
    department: &Department,
    total_computations: Arc<AtomicUsize>,
    loaded_at_computations: Arc<AtomicUsize>,
) -> EntityDefinition {
    EntityDefinition::builder(employee.entity_type.clone())
        .define(ColumnDefinition::primary_key(employee.id.clone()))
        .unwrap()
        .define(
            ColumnDefinition::builder(employee.name.clone())
                .caption(Some("Name"))
                .nullable(false),
        )
        .unwrap()
        .define(
            ColumnDefinition::item_builder(
                employee.status.clone(),
                vec![Item::new("H", "Hired"), Item::new("F", "Fired")],
            )
            .unwrap(),
        )
        .unwrap()
        .define(
            ColumnDefinition::builder(employee.salary.clone())
                .value_range(Some(1000.0), Some(10000.0))
                .unwrap()
                .maximum_fraction_digits(2)
                .unwrap(),
        )
        .unwrap()
        .define(ColumnDefinition::builder(employee.commission.clone()))
        .unwrap()
        .define(total(employee, total_computations))
        .unwrap()
        .define(
            DerivedDefinition::builder(
                employee.total_doubled.clone(),
                [employee.total.clone()],
                |values: &SourceValues<'_>| Ok(Value::Double(sum(values)? * 2.0)),
            )
            .unwrap(),
        )
        .unwrap()
        .define(
            DerivedDefinition::builder(
                employee.loaded_at.clone(),
                [],
                move |_: &SourceValues<'_>| {
                    let count = loaded_at_computations.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Long(count as i64))
                },
            )
            .unwrap(),
        )
        .unwrap()
        .define(ColumnDefinition::builder(employee.department_id.clone()))
        .unwrap()
        .define(ForeignKeyDefinition::builder(employee.department_fk.clone()))
        .unwrap()
        .define(
            DerivedDefinition::denormalized(
                employee.department_name.clone(),
                &employee.department_fk,
                department.name.clone(),
            )
            .unwrap(),
        )
        .unwrap()
        .define(ColumnDefinition::builder(employee.country.clone()))
        .unwrap()
        .define(ColumnDefinition::builder(employee.city.clone()))
        .unwrap()
        .define(
            ForeignKeyDefinition::builder(employee.location_fk.clone())
                .read_only(&employee.country)
                .unwrap(),
        )
        .unwrap()
        .define(TransientDefinition::builder(employee.note.clone()))
        .unwrap()
        .build()
        .unwrap()
}
