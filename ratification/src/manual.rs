/*!

This is the long-form manual for `ratification` and `ratify`.

## The data model

A document holds two collections:

* `members`: the registry of voters. Each member has a unique, case-sensitive
  name and an opaque credential hash. The registry is ordered and members are
  never removed.
* `candidates`: the entities nominated for ratification. Each candidate holds
  a partial vote ledger (member name to yes/no), a derived `status`, the legacy
  `ratified` boolean, and a cached `totalMembers` count.

## Status rules

A candidate's status is always derived from its ledger and the registry:

| situation | status |
|---|---|
| every member voted yes | `banned` |
| every member voted no (no abstentions) | `allowed` |
| anything else, including an empty registry | `pending` |

The asymmetry is deliberate: a missing ballot blocks unanimous approval, but it
also blocks unanimous rejection. Silence never rejects a candidate.

Recording a vote overwrites any earlier vote by the same member; there is no
way to retract a vote back to "not voted" short of reopening the candidate.

Adding a member reverts every `banned` or `allowed` candidate to `pending`,
since the newcomer has not voted yet, and refreshes every `totalMembers` cache.

## Admin actions

* **reopen** clears a candidate's ledger. All prior votes are discarded
  irrecoverably.
* **force status** rewrites the ledger to a unanimous vote matching the forced
  outcome (or clears it when forcing `pending`). A later recompute therefore
  agrees with the override instead of contradicting it.
* **resolve by tally** decides from the votes cast so far: under `majority`, a
  yes-majority bans and a no-majority allows; under `opposite` the mapping is
  inverted. Ties favor yes, including the empty 0-0 tally. The ledger is left
  untouched, so the next vote recorded re-derives the status from unanimity
  rules again.
* **remove** deletes the candidate entirely.

## The persisted document

The host serializes the whole document on every mutation and reloads it before
every operation. Example:

```json
{
  "members": [
    { "name": "Alice A", "credentialHash": "03ac67..." }
  ],
  "candidates": [
    {
      "id": "a1b2c3d",
      "firstName": "Jamie",
      "lastInitial": "S",
      "notes": "",
      "votes": { "Alice A": true },
      "status": "pending",
      "ratified": false,
      "totalMembers": 1,
      "createdAt": "2026-08-06T12:00:00.000Z"
    }
  ]
}
```

Documents written by older hosts may lack the `status` field; it is then
derived from `ratified` on load.

*/
