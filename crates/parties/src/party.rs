use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pricedesk_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, Event};
use pricedesk_pricelists::PricelistId;

/// Party identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub AggregateId);

impl PartyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

/// Aggregate root: Party (customer or supplier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    id: PartyId,
    company_id: Option<CompanyId>,
    kind: PartyKind,
    name: String,
    pricelist_id: Option<PricelistId>,
    version: u64,
    created: bool,
}

impl Party {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PartyId) -> Self {
        Self {
            id,
            company_id: None,
            kind: PartyKind::Customer,
            name: String::new(),
            pricelist_id: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default pricelist for sales documents addressed to this party.
    pub fn pricelist_id(&self) -> Option<PricelistId> {
        self.pricelist_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterParty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParty {
    pub company_id: CompanyId,
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub pricelist_id: Option<PricelistId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetPartyPricelist (`None` clears the default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPartyPricelist {
    pub company_id: CompanyId,
    pub party_id: PartyId,
    pub pricelist_id: Option<PricelistId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyCommand {
    RegisterParty(RegisterParty),
    SetPartyPricelist(SetPartyPricelist),
}

/// Event: PartyRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRegistered {
    pub company_id: CompanyId,
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub pricelist_id: Option<PricelistId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartyPricelistChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyPricelistChanged {
    pub company_id: CompanyId,
    pub party_id: PartyId,
    pub pricelist_id: Option<PricelistId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyEvent {
    PartyRegistered(PartyRegistered),
    PartyPricelistChanged(PartyPricelistChanged),
}

impl Event for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::PartyRegistered(_) => "parties.party.registered",
            PartyEvent::PartyPricelistChanged(_) => "parties.party.pricelist_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartyEvent::PartyRegistered(e) => e.occurred_at,
            PartyEvent::PartyPricelistChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Party {
    type Command = PartyCommand;
    type Event = PartyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartyEvent::PartyRegistered(e) => {
                self.id = e.party_id;
                self.company_id = Some(e.company_id);
                self.kind = e.kind;
                self.name = e.name.clone();
                self.pricelist_id = e.pricelist_id;
                self.created = true;
            }
            PartyEvent::PartyPricelistChanged(e) => {
                self.pricelist_id = e.pricelist_id;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartyCommand::RegisterParty(cmd) => self.handle_register(cmd),
            PartyCommand::SetPartyPricelist(cmd) => self.handle_set_pricelist(cmd),
        }
    }
}

impl Party {
    fn handle_register(&self, cmd: &RegisterParty) -> Result<Vec<PartyEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("party already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![PartyEvent::PartyRegistered(PartyRegistered {
            company_id: cmd.company_id,
            party_id: cmd.party_id,
            kind: cmd.kind,
            name: cmd.name.clone(),
            pricelist_id: cmd.pricelist_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_pricelist(
        &self,
        cmd: &SetPartyPricelist,
    ) -> Result<Vec<PartyEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("party {}", cmd.party_id)));
        }
        if self.company_id != Some(cmd.company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        if self.id != cmd.party_id {
            return Err(DomainError::invariant("party_id mismatch"));
        }
        if self.pricelist_id == cmd.pricelist_id {
            return Ok(vec![]);
        }

        Ok(vec![PartyEvent::PartyPricelistChanged(PartyPricelistChanged {
            company_id: cmd.company_id,
            party_id: cmd.party_id,
            pricelist_id: cmd.pricelist_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
